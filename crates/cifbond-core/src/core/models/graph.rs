use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Header of the CIF loop that carries geometric bond records.
pub const GEOM_BOND_LOOP_HEADER: &str = "loop_
_geom_bond_atom_site_label_1
_geom_bond_atom_site_label_2
_geom_bond_distance
";

/// Canonical key of one bonded atom pair.
///
/// The endpoint with the lower ingestion serial is always stored first, so a pair has exactly
/// one key no matter which side discovered it. Keys order by serials.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BondKey {
    first_serial: usize,
    second_serial: usize,
    first: String,
    second: String,
}

impl BondKey {
    pub fn new(a: (usize, &str), b: (usize, &str)) -> Self {
        let (lo, hi) = if (a.0, a.1) <= (b.0, b.1) { (a, b) } else { (b, a) };
        Self {
            first_serial: lo.0,
            second_serial: hi.0,
            first: lo.1.to_string(),
            second: hi.1.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn serials(&self) -> (usize, usize) {
        (self.first_serial, self.second_serial)
    }
}

impl fmt::Display for BondKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.second)
    }
}

/// Undirected bond graph keyed by node names. Never holds parallel edges or self-loops.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondGraph {
    adjacency: BTreeMap<String, BTreeMap<String, f64>>,
}

impl BondGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an undirected edge. Returns `false` when the edge already exists (the stored
    /// weight is kept) or when both endpoints are the same node.
    pub fn add_edge(&mut self, a: &str, b: &str, weight: f64) -> bool {
        if a == b || self.has_edge(a, b) {
            return false;
        }
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string(), weight);
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string(), weight);
        true
    }

    pub fn has_edge(&self, a: &str, b: &str) -> bool {
        self.adjacency
            .get(a)
            .is_some_and(|neighbors| neighbors.contains_key(b))
    }

    pub fn weight(&self, a: &str, b: &str) -> Option<f64> {
        self.adjacency.get(a)?.get(b).copied()
    }

    pub fn contains_node(&self, name: &str) -> bool {
        self.adjacency.contains_key(name)
    }

    pub fn neighbors<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.adjacency
            .get(name)
            .into_iter()
            .flat_map(|neighbors| neighbors.keys().map(String::as_str))
    }

    pub fn degree(&self, name: &str) -> usize {
        self.adjacency.get(name).map_or(0, BTreeMap::len)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.adjacency.keys().map(String::as_str)
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency.values().map(BTreeMap::len).sum::<usize>() / 2
    }

    /// Every edge once, as `(a, b, weight)` with `a < b` in name order.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, f64)> {
        self.adjacency.iter().flat_map(|(a, neighbors)| {
            neighbors
                .iter()
                .filter(move |(b, _)| a.as_str() < b.as_str())
                .map(move |(b, &w)| (a.as_str(), b.as_str(), w))
        })
    }
}

/// Distance per bonded pair, exactly one entry per unordered pair in canonical direction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistanceMap {
    entries: BTreeMap<BondKey, f64>,
    by_names: HashMap<(String, String), f64>,
}

impl DistanceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a distance. An already-present key keeps its first value.
    pub fn insert(&mut self, key: BondKey, distance: f64) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.by_names
            .insert((key.first.clone(), key.second.clone()), distance);
        self.entries.insert(key, distance);
        true
    }

    /// Looks a pair up by node names in either order.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.by_names
            .get(&(a.to_string(), b.to_string()))
            .or_else(|| self.by_names.get(&(b.to_string(), a.to_string())))
            .copied()
    }

    /// Whether `(a, b)` is stored in exactly this direction.
    pub fn contains_directed(&self, a: &str, b: &str) -> bool {
        self.by_names.contains_key(&(a.to_string(), b.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&BondKey, f64)> {
        self.entries.iter().map(|(k, &d)| (k, d))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The result of one bond build: graph and distance map, always produced and replaced together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondNetwork {
    graph: BondGraph,
    distances: DistanceMap,
}

impl BondNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a bond between two `(serial, node_name)` endpoints.
    ///
    /// Zero, negative or non-finite distances and self-pairs are rejected, as are pairs
    /// already present.
    pub fn insert(&mut self, a: (usize, &str), b: (usize, &str), distance: f64) -> bool {
        if !(distance.is_finite() && distance > 0.0) || a.0 == b.0 {
            return false;
        }
        let key = BondKey::new(a, b);
        if !self.graph.add_edge(key.first(), key.second(), distance) {
            return false;
        }
        self.distances.insert(key, distance)
    }

    pub fn graph(&self) -> &BondGraph {
        &self.graph
    }

    pub fn distances(&self) -> &DistanceMap {
        &self.distances
    }

    pub fn bond_count(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// One serialized bond line: two external labels and a distance.
#[derive(Debug, Clone, PartialEq)]
pub struct BondRecord {
    pub label_1: String,
    pub label_2: String,
    pub distance: f64,
}

impl fmt::Display for BondRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<10} {:<10} {:>10.4}",
            self.label_1, self.label_2, self.distance
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bond_key_orders_endpoints_by_serial() {
        let forward = BondKey::new((2, "O_2"), (5, "Si_5"));
        let reverse = BondKey::new((5, "Si_5"), (2, "O_2"));
        assert_eq!(forward, reverse);
        assert_eq!(forward.first(), "O_2");
        assert_eq!(forward.second(), "Si_5");
        assert_eq!(forward.serials(), (2, 5));
        assert_eq!(forward.to_string(), "O_2-Si_5");
    }

    #[test]
    fn bond_keys_sort_by_serial_not_name() {
        let mut keys = vec![
            BondKey::new((10, "A_10"), (11, "A_11")),
            BondKey::new((2, "Z_2"), (3, "Z_3")),
        ];
        keys.sort();
        assert_eq!(keys[0].serials(), (2, 3));
    }

    #[test]
    fn graph_add_edge_is_idempotent_and_rejects_self_loops() {
        let mut graph = BondGraph::new();
        assert!(graph.add_edge("O_0", "Si_1", 1.6));
        assert!(!graph.add_edge("Si_1", "O_0", 1.7));
        assert!(!graph.add_edge("O_0", "O_0", 1.0));

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.weight("Si_1", "O_0"), Some(1.6));
        assert_eq!(graph.degree("O_0"), 1);
        assert_eq!(graph.neighbors("O_0").collect::<Vec<_>>(), vec!["Si_1"]);
        assert!(!graph.contains_node("H_9"));
    }

    #[test]
    fn graph_edges_lists_each_edge_once() {
        let mut graph = BondGraph::new();
        graph.add_edge("a", "b", 1.0);
        graph.add_edge("c", "a", 2.0);
        graph.add_edge("b", "c", 3.0);
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges, vec![("a", "b", 1.0), ("a", "c", 2.0), ("b", "c", 3.0)]);
    }

    #[test]
    fn distance_map_lookup_works_in_both_orders_but_stores_one_direction() {
        let mut map = DistanceMap::new();
        assert!(map.insert(BondKey::new((4, "O_4"), (1, "Si_1")), 1.61));
        assert!(!map.insert(BondKey::new((1, "Si_1"), (4, "O_4")), 9.0));

        assert_eq!(map.len(), 1);
        assert_eq!(map.get("O_4", "Si_1"), Some(1.61));
        assert_eq!(map.get("Si_1", "O_4"), Some(1.61));
        assert!(map.contains_directed("Si_1", "O_4"));
        assert!(!map.contains_directed("O_4", "Si_1"));
    }

    #[test]
    fn network_rejects_zero_and_non_finite_distances() {
        let mut network = BondNetwork::new();
        assert!(!network.insert((0, "O_0"), (1, "O_1"), 0.0));
        assert!(!network.insert((0, "O_0"), (1, "O_1"), f64::NAN));
        assert!(!network.insert((0, "O_0"), (0, "O_0"), 1.0));
        assert!(network.is_empty());
        assert_eq!(network.graph().edge_count(), 0);
    }

    #[test]
    fn network_keeps_graph_and_distances_in_step() {
        let mut network = BondNetwork::new();
        assert!(network.insert((3, "O_3"), (0, "Si_0"), 1.6));
        assert!(!network.insert((0, "Si_0"), (3, "O_3"), 1.6));
        assert!(network.insert((0, "Si_0"), (5, "O_5"), 1.62));

        assert_eq!(network.bond_count(), 2);
        assert_eq!(network.graph().edge_count(), 2);
        for (key, distance) in network.distances().iter() {
            assert_eq!(network.graph().weight(key.first(), key.second()), Some(distance));
        }
    }

    #[test]
    fn bond_record_line_matches_fixed_columns() {
        let record = BondRecord {
            label_1: "Si1".into(),
            label_2: "O12".into(),
            distance: 1.6123456,
        };
        assert_eq!(record.to_string(), "Si1        O12            1.6123");
    }
}
