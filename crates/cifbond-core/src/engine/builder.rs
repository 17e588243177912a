use super::config::{BondConfig, ElementPair};
use super::error::EngineError;
use super::progress::{Progress, ProgressReporter};
use super::report::{BuildReport, BuildWarning};
use crate::core::geometry::periodic::PeriodicNeighborSearch;
use crate::core::models::graph::BondNetwork;
use crate::core::models::structure::StructureModel;
use crate::core::params::radii::{CovalentRadiusTable, UNKNOWN_ELEMENT_RADIUS};
use nalgebra::Point3;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// Added to each pair threshold for the candidate search. Candidates are then accepted or
/// rejected on the canonical distance against the exact threshold.
const SEARCH_SLACK: f64 = 1e-6;

#[derive(Debug, Clone)]
struct Site {
    serial: usize,
    node: String,
    position: Point3<f64>,
}

/// A freshly built bond network and the report describing how it was built.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutcome {
    pub network: BondNetwork,
    pub report: BuildReport,
}

/// Derives bonds from covalent-radius thresholds under periodic boundaries.
///
/// Each build is independent: it returns a new [`BondNetwork`] and never reads or merges a
/// previously installed one. Every bonded pair is stored once, keyed from the atom with the
/// lower ingestion serial, and its distance is the minimum-image distance evaluated in that
/// direction, so the result does not depend on the order in which pairs or atoms are scanned.
pub struct BondGraphBuilder<'a> {
    radii: &'a CovalentRadiusTable,
    config: &'a BondConfig,
}

impl<'a> BondGraphBuilder<'a> {
    pub fn new(radii: &'a CovalentRadiusTable, config: &'a BondConfig) -> Self {
        Self { radii, config }
    }

    /// Builds the bond network of `structure`, assigning node names first if needed.
    ///
    /// # Errors
    ///
    /// Fails before any geometry work when the configuration is invalid or periodic
    /// boundaries are requested without a cell. Unknown elements are not errors; they are
    /// listed in the returned report.
    #[instrument(skip_all, name = "bond_graph_build")]
    pub fn build(
        &self,
        structure: &mut StructureModel,
        reporter: &ProgressReporter,
    ) -> Result<BuildOutcome, EngineError> {
        self.config.validate()?;
        let search = PeriodicNeighborSearch::new(structure.cell(), structure.periodicity())?;
        structure.ensure_node_names();

        let sites = collect_sites(structure)?;
        let pairs = self.config.pairs.resolve(self.radii);
        let mut report = BuildReport {
            warnings: self.unknown_element_warnings(&sites, &pairs),
            image_count: search.image_count(),
            ..Default::default()
        };
        for warning in &report.warnings {
            warn!("{}", warning);
        }

        reporter.report(Progress::PairsStart {
            total: pairs.len() as u64,
        });

        let mut network = BondNetwork::new();
        for pair in &pairs {
            let (Some(sources), Some(targets)) = (sites.get(pair.first()), sites.get(pair.second()))
            else {
                debug!(pair = %pair, "Skipping pair with no atoms on one side.");
                report.skipped_pairs.push(pair.clone());
                reporter.report(Progress::PairSkipped {
                    pair: pair.to_string(),
                });
                continue;
            };

            let threshold = self
                .radii
                .bond_threshold(pair.first(), pair.second(), self.config.tolerance);
            let added = scan_pair(&search, sources, targets, threshold, &mut network);
            report.pairs_scanned += 1;

            debug!(pair = %pair, threshold, added, "Scanned element pair.");
            reporter.report(Progress::PairDone {
                pair: pair.to_string(),
                bonds: added,
            });
        }

        report.bond_count = network.bond_count();
        info!(
            bonds = report.bond_count,
            pairs = report.pairs_scanned,
            skipped = report.skipped_pairs.len(),
            "Bond network built."
        );
        reporter.report(Progress::Finished {
            bonds: report.bond_count,
        });

        Ok(BuildOutcome { network, report })
    }

    /// One warning per distinct element, present in the structure or named by a scanned
    /// pair, that the radius table does not list.
    fn unknown_element_warnings(
        &self,
        sites: &BTreeMap<String, Vec<Site>>,
        pairs: &[ElementPair],
    ) -> Vec<BuildWarning> {
        let mentioned: BTreeSet<&str> = sites
            .keys()
            .map(String::as_str)
            .chain(pairs.iter().flat_map(|p| [p.first(), p.second()]))
            .collect();
        mentioned
            .into_iter()
            .filter(|element| !self.radii.contains(element))
            .map(|element| BuildWarning::UnknownElement {
                element: element.to_string(),
                radius: UNKNOWN_ELEMENT_RADIUS,
            })
            .collect()
    }
}

/// Atoms grouped by element, each group in current row order.
fn collect_sites(structure: &StructureModel) -> Result<BTreeMap<String, Vec<Site>>, EngineError> {
    let mut sites: BTreeMap<String, Vec<Site>> = BTreeMap::new();
    for (_, atom) in structure.atoms() {
        let node = atom.node_name().ok_or_else(|| {
            EngineError::Internal(format!("atom {} has no node name after naming", atom.serial))
        })?;
        sites.entry(atom.element.clone()).or_default().push(Site {
            serial: atom.serial,
            node: node.to_string(),
            position: atom.position,
        });
    }
    Ok(sites)
}

/// Adds every bond between `sources` and `targets` within `threshold` and returns how many
/// were new.
fn scan_pair(
    search: &PeriodicNeighborSearch,
    sources: &[Site],
    targets: &[Site],
    threshold: f64,
    network: &mut BondNetwork,
) -> usize {
    let source_points: Vec<_> = sources.iter().map(|s| s.position).collect();
    let target_points: Vec<_> = targets.iter().map(|s| s.position).collect();
    let candidates = search.search(&source_points, &target_points, threshold + SEARCH_SLACK);

    let mut added = 0;
    for (source, neighbors) in sources.iter().zip(&candidates) {
        for neighbor in neighbors {
            let target = &targets[neighbor.index];
            if source.serial == target.serial {
                continue;
            }
            let (lo, hi) = if source.serial < target.serial {
                (source, target)
            } else {
                (target, source)
            };
            let distance = search.minimum_image_distance(&lo.position, &hi.position);
            if distance == 0.0 || distance > threshold {
                continue;
            }
            if network.insert(
                (lo.serial, lo.node.as_str()),
                (hi.serial, hi.node.as_str()),
                distance,
            ) {
                added += 1;
            }
        }
    }
    added
}
