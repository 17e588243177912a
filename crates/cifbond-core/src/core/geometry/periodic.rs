use crate::core::models::cell::{Cell, CellError, Periodicity};
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::{Point3, Vector3};
use std::collections::BTreeMap;
use tracing::trace;

/// Relative widening of the tree query; hits are re-checked exactly afterwards.
const QUERY_SLACK: f64 = 1e-9;

/// Built in one pass from the full image set. Unlike an incrementally filled tree, this
/// layout accepts any number of points sharing a coordinate, which periodic replication
/// of sheets and chains produces in bulk.
type ImageTree = ImmutableKdTree<f64, 3>;

/// A target found within the search radius, identified by its index in the target slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// Every periodic image of a target set, each remembering which target it came from.
#[derive(Debug, Clone)]
pub struct PeriodicImages {
    points: Vec<Point3<f64>>,
    origins: Vec<usize>,
}

impl PeriodicImages {
    pub fn expand(targets: &[Point3<f64>], shifts: &[Vector3<f64>]) -> Self {
        let capacity = targets.len() * shifts.len();
        let mut points = Vec::with_capacity(capacity);
        let mut origins = Vec::with_capacity(capacity);
        for shift in shifts {
            for (index, target) in targets.iter().enumerate() {
                points.push(target + shift);
                origins.push(index);
            }
        }
        Self { points, origins }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, image: usize) -> &Point3<f64> {
        &self.points[image]
    }

    /// Index of the original target that `image` is a translated copy of.
    pub fn origin(&self, image: usize) -> usize {
        self.origins[image]
    }

    /// Item `i` of the returned tree is image `i`.
    fn tree(&self) -> ImageTree {
        let coordinates: Vec<[f64; 3]> = self.points.iter().map(|p| [p.x, p.y, p.z]).collect();
        ImageTree::new_from_slice(&coordinates)
    }
}

/// Radius-limited nearest-image search under orthorhombic periodic boundaries.
///
/// Targets are replicated into every image selected by the periodic flags (27 when all three
/// axes are periodic) and indexed once in a k-d tree. Each source then collects the targets
/// with an image within the radius, keeping only the nearest image per target. Zero
/// distances, including a point matched against itself, are returned as found.
///
/// Points may lie anywhere; they are wrapped into the primary cell along periodic axes
/// before images are generated, so an atom stored several cells away is still seen at its
/// minimum image.
#[derive(Debug, Clone)]
pub struct PeriodicNeighborSearch {
    cell: Option<Cell>,
    periodicity: Periodicity,
    shifts: Vec<Vector3<f64>>,
}

impl PeriodicNeighborSearch {
    /// Fails with [`CellError::Missing`] when any axis is periodic but no cell is given.
    pub fn new(cell: Option<&Cell>, periodicity: Periodicity) -> Result<Self, CellError> {
        let shifts = match cell {
            Some(cell) => cell.image_shifts(periodicity),
            None if periodicity.any() => return Err(CellError::Missing),
            None => vec![Vector3::zeros()],
        };
        Ok(Self {
            cell: cell.copied(),
            periodicity,
            shifts,
        })
    }

    pub fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    pub fn image_count(&self) -> usize {
        self.shifts.len()
    }

    /// `position` folded into the primary cell along periodic axes.
    pub fn wrap(&self, position: &Point3<f64>) -> Point3<f64> {
        match &self.cell {
            Some(cell) => cell.wrap(position, self.periodicity),
            None => *position,
        }
    }

    /// Smallest distance from `a` to any image of `b` considered by this search.
    pub fn minimum_image_distance(&self, a: &Point3<f64>, b: &Point3<f64>) -> f64 {
        let (a, b) = (self.wrap(a), self.wrap(b));
        self.shifts
            .iter()
            .map(|shift| (a - (b + shift)).norm())
            .fold(f64::INFINITY, f64::min)
    }

    /// For every source point, the targets within `radius`, sorted by target index.
    ///
    /// A negative or non-finite radius matches nothing.
    pub fn search(
        &self,
        sources: &[Point3<f64>],
        targets: &[Point3<f64>],
        radius: f64,
    ) -> Vec<Vec<Neighbor>> {
        let mut results = vec![Vec::new(); sources.len()];
        if sources.is_empty() || targets.is_empty() || !radius.is_finite() || radius < 0.0 {
            return results;
        }

        let targets: Vec<_> = targets.iter().map(|p| self.wrap(p)).collect();
        let images = PeriodicImages::expand(&targets, &self.shifts);
        let tree = images.tree();
        let query_radius_sq = radius * radius * (1.0 + QUERY_SLACK) + f64::EPSILON;

        for (source, found) in sources.iter().zip(results.iter_mut()) {
            let source = self.wrap(source);
            let mut nearest: BTreeMap<usize, f64> = BTreeMap::new();
            let hits = tree.within_unsorted::<SquaredEuclidean>(
                &[source.x, source.y, source.z],
                query_radius_sq,
            );
            for hit in hits {
                let image = hit.item as usize;
                let distance = (images.point(image) - source).norm();
                if distance > radius {
                    continue;
                }
                nearest
                    .entry(images.origin(image))
                    .and_modify(|best| *best = best.min(distance))
                    .or_insert(distance);
            }
            *found = nearest
                .into_iter()
                .map(|(index, distance)| Neighbor { index, distance })
                .collect();
        }

        trace!(
            sources = sources.len(),
            targets = targets.len(),
            images = images.len(),
            radius,
            "Periodic neighbor search complete."
        );
        results
    }
}
