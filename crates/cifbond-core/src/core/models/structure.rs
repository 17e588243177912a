use super::atom::AtomRecord;
use super::cell::{Cell, CellError, Periodicity};
use super::graph::{BondNetwork, BondRecord, GEOM_BOND_LOOP_HEADER};
use super::ids::AtomId;
use nalgebra::Point3;
use slotmap::SlotMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StructureError {
    #[error("Row {row}: required field '{field}' is missing")]
    MissingField { row: usize, field: &'static str },

    #[error("Row {row}: coordinate '{axis}' is not finite ({value})")]
    InvalidPosition { row: usize, axis: char, value: f64 },

    #[error("Invalid cell: {0}")]
    Cell(#[from] CellError),

    #[error("Bond records were requested before a bond network was built")]
    PrematureSerialization,

    #[error("Bond network references node '{0}', which is not an atom of this structure")]
    UnknownNode(String),
}

/// Lifecycle stage of a [`StructureModel`], derived from its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StructureState {
    /// No atoms.
    Uninitialized,
    /// Atoms present, at least one without a node name.
    Loaded,
    /// Every atom has a node name, no bond network installed.
    Named,
    /// A bond network is installed.
    Built,
}

/// Row-ordering criteria for [`StructureModel::sort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortKey {
    /// Ingestion order (by serial).
    #[default]
    Ingestion,
    Element,
    Residue,
    X,
    Y,
    Z,
}

impl SortKey {
    fn compare(self, a: &AtomRecord, b: &AtomRecord) -> Ordering {
        match self {
            SortKey::Ingestion => a.serial.cmp(&b.serial),
            SortKey::Element => a.element.cmp(&b.element),
            SortKey::Residue => a.residue.cmp(&b.residue),
            SortKey::X => a.position.x.total_cmp(&b.position.x),
            SortKey::Y => a.position.y.total_cmp(&b.position.y),
            SortKey::Z => a.position.z.total_cmp(&b.position.z),
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ingestion" | "default" | "serial" => Ok(SortKey::Ingestion),
            "element" | "atom_name" | "atom-name" => Ok(SortKey::Element),
            "residue" | "res_name" | "res-name" => Ok(SortKey::Residue),
            "x" => Ok(SortKey::X),
            "y" => Ok(SortKey::Y),
            "z" => Ok(SortKey::Z),
            other => Err(format!(
                "unknown sort key '{}' (expected ingestion, element, residue, x, y or z)",
                other
            )),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Ingestion => "ingestion",
            SortKey::Element => "element",
            SortKey::Residue => "residue",
            SortKey::X => "x",
            SortKey::Y => "y",
            SortKey::Z => "z",
        };
        f.write_str(name)
    }
}

/// The atom table of a periodic structure together with its cell and the most recently
/// installed bond network.
///
/// Atoms are stored in an arena keyed by [`AtomId`]; row order is kept separately so rows
/// can be reordered without touching identities. Node names are assigned lazily, once per
/// atom, and remain valid across reorders. CIF identities are recomputed on every reorder.
#[derive(Debug, Clone, Default)]
pub struct StructureModel {
    atoms: SlotMap<AtomId, AtomRecord>,
    order: Vec<AtomId>,
    cell: Option<Cell>,
    periodicity: Periodicity,
    bonds: Option<BondNetwork>,
    next_serial: usize,
    element_counts: HashMap<String, usize>,
}

impl StructureModel {
    pub fn new(cell: Option<Cell>, periodicity: Periodicity) -> Self {
        Self {
            cell,
            periodicity,
            ..Default::default()
        }
    }

    pub fn cell(&self) -> Option<&Cell> {
        self.cell.as_ref()
    }

    pub fn periodicity(&self) -> Periodicity {
        self.periodicity
    }

    /// Changes the periodic boundary flags. Any installed bond network is discarded.
    pub fn set_periodicity(&mut self, periodicity: Periodicity) {
        if periodicity != self.periodicity {
            self.periodicity = periodicity;
            self.discard_bonds("periodicity changed");
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn state(&self) -> StructureState {
        if self.order.is_empty() {
            StructureState::Uninitialized
        } else if self.bonds.is_some() {
            StructureState::Built
        } else if self.atoms.values().all(|atom| atom.node_name.is_some()) {
            StructureState::Named
        } else {
            StructureState::Loaded
        }
    }

    /// Appends an atom as the last row and returns its id.
    ///
    /// The atom receives the next ingestion serial and a CIF identity; its node name is
    /// assigned by the next naming pass. Any installed bond network is discarded.
    pub fn add_atom(
        &mut self,
        element: &str,
        position: Point3<f64>,
        residue: &str,
    ) -> Result<AtomId, StructureError> {
        let row = self.order.len();
        let element = element.trim();
        if element.is_empty() {
            return Err(StructureError::MissingField {
                row,
                field: "element",
            });
        }
        for (axis, value) in ['x', 'y', 'z'].into_iter().zip(position.coords.iter()) {
            if !value.is_finite() {
                return Err(StructureError::InvalidPosition {
                    row,
                    axis,
                    value: *value,
                });
            }
        }

        let count = self.element_counts.entry(element.to_string()).or_insert(0);
        *count += 1;
        let cif_id = *count;

        let mut atom = AtomRecord::new(element, position, residue, self.next_serial);
        atom.row = row;
        atom.assign_cif_id(cif_id);
        self.next_serial += 1;

        let id = self.atoms.insert(atom);
        self.order.push(id);
        self.discard_bonds("atom added");
        Ok(id)
    }

    pub fn atom(&self, id: AtomId) -> Option<&AtomRecord> {
        self.atoms.get(id)
    }

    pub(crate) fn atom_mut(&mut self, id: AtomId) -> Option<&mut AtomRecord> {
        self.atoms.get_mut(id)
    }

    /// Atoms in current row order.
    pub fn atoms(&self) -> impl Iterator<Item = (AtomId, &AtomRecord)> {
        self.order.iter().map(|&id| (id, &self.atoms[id]))
    }

    /// Distinct element symbols present, sorted.
    pub fn elements(&self) -> BTreeSet<&str> {
        self.atoms.values().map(|atom| atom.element.as_str()).collect()
    }

    /// Assigns node names to every atom that does not have one yet and returns how many
    /// were assigned. Existing names are never changed.
    pub fn ensure_node_names(&mut self) -> usize {
        let assigned = self
            .atoms
            .values_mut()
            .map(AtomRecord::assign_node_name)
            .filter(|&assigned| assigned)
            .count();
        if assigned > 0 {
            debug!(assigned, "Assigned node names.");
        }
        assigned
    }

    /// Stable reorder of the rows by `key`.
    pub fn sort(&mut self, key: SortKey) {
        self.sort_by(|a, b| key.compare(a, b));
    }

    /// Stable reorder of the rows by an arbitrary comparator.
    ///
    /// Row ids become `0..N` in the new order and CIF identities are recomputed per element.
    /// Node names, and therefore any installed bond network, are left untouched.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&AtomRecord, &AtomRecord) -> Ordering,
    {
        let atoms = &self.atoms;
        self.order.sort_by(|&a, &b| compare(&atoms[a], &atoms[b]));
        self.renumber_rows();
    }

    fn renumber_rows(&mut self) {
        let mut counters: HashMap<String, usize> = HashMap::new();
        for (row, &id) in self.order.iter().enumerate() {
            let atom = &mut self.atoms[id];
            let counter = counters.entry(atom.element.clone()).or_insert(0);
            *counter += 1;
            atom.row = row;
            atom.assign_cif_id(*counter);
        }
    }

    /// The node-name to CIF-name mapping for every named atom.
    pub fn node_to_cif(&self) -> BTreeMap<String, String> {
        self.atoms
            .values()
            .filter_map(|atom| {
                atom.node_name
                    .as_ref()
                    .map(|node| (node.clone(), atom.cif_name.clone()))
            })
            .collect()
    }

    /// Replaces any previously installed bond network wholesale.
    pub fn install_bonds(&mut self, network: BondNetwork) -> Result<(), StructureError> {
        let known = self.node_to_cif();
        if let Some(unknown) = network.graph().nodes().find(|node| !known.contains_key(*node)) {
            return Err(StructureError::UnknownNode(unknown.to_string()));
        }
        debug!(
            bonds = network.bond_count(),
            replaced = self.bonds.is_some(),
            "Installing bond network."
        );
        self.bonds = Some(network);
        Ok(())
    }

    pub fn bonds(&self) -> Option<&BondNetwork> {
        self.bonds.as_ref()
    }

    fn discard_bonds(&mut self, reason: &str) {
        if self.bonds.take().is_some() {
            debug!(reason, "Discarded installed bond network.");
        }
    }

    /// Bond records labelled with CIF names, in canonical distance-map order.
    pub fn bond_records(&self) -> Result<Vec<BondRecord>, StructureError> {
        let network = self
            .bonds
            .as_ref()
            .ok_or(StructureError::PrematureSerialization)?;
        let labels = self.node_to_cif();
        let label = |node: &str| -> Result<String, StructureError> {
            labels
                .get(node)
                .cloned()
                .ok_or_else(|| StructureError::UnknownNode(node.to_string()))
        };

        let mut records = Vec::with_capacity(network.bond_count());
        for (key, distance) in network.distances().iter() {
            records.push(BondRecord {
                label_1: label(key.first())?,
                label_2: label(key.second())?,
                distance,
            });
        }
        Ok(records)
    }

    /// The geometric bond loop, header included, one line per stored bond.
    pub fn geom_bond_block(&self) -> Result<String, StructureError> {
        let records = self.bond_records()?;
        let mut block = String::from(GEOM_BOND_LOOP_HEADER);
        for record in records {
            block.push_str(&record.to_string());
            block.push('\n');
        }
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_structure() -> StructureModel {
        let cell = Cell::orthorhombic(10.0, 10.0, 10.0).unwrap();
        let mut structure = StructureModel::new(Some(cell), Periodicity::ALL);
        structure.add_atom("O", Point3::new(3.0, 0.0, 0.0), "SIO").unwrap();
        structure.add_atom("Si", Point3::new(1.0, 0.0, 0.0), "SIO").unwrap();
        structure.add_atom("O", Point3::new(2.0, 0.0, 0.0), "SIO").unwrap();
        structure.add_atom("Si", Point3::new(0.0, 0.0, 0.0), "SIO").unwrap();
        structure.add_atom("O", Point3::new(4.0, 0.0, 0.0), "SIO").unwrap();
        structure
    }

    fn cif_ids_for(structure: &StructureModel, element: &str) -> Vec<usize> {
        structure
            .atoms()
            .filter(|(_, atom)| atom.element == element)
            .map(|(_, atom)| atom.cif_id())
            .collect()
    }

    #[test]
    fn cif_ids_count_per_element_in_row_order() {
        let structure = sample_structure();
        assert_eq!(cif_ids_for(&structure, "O"), vec![1, 2, 3]);
        assert_eq!(cif_ids_for(&structure, "Si"), vec![1, 2]);
        let names: Vec<_> = structure.atoms().map(|(_, a)| a.cif_name().to_string()).collect();
        assert_eq!(names, vec!["O1", "Si1", "O2", "Si2", "O3"]);
    }

    #[test]
    fn atoms_appended_after_a_sort_continue_the_element_count() {
        let mut structure = StructureModel::new(None, Periodicity::NONE);
        for i in 0..3000 {
            let element = if i % 3 == 0 { "Si" } else { "O" };
            structure
                .add_atom(element, Point3::new(i as f64, 0.0, 0.0), "SIO")
                .unwrap();
        }
        assert_eq!(cif_ids_for(&structure, "Si"), (1..=1000).collect::<Vec<_>>());
        assert_eq!(cif_ids_for(&structure, "O"), (1..=2000).collect::<Vec<_>>());

        structure.sort_by(|a, b| b.position.x.total_cmp(&a.position.x));
        let id = structure.add_atom("Si", Point3::origin(), "SIO").unwrap();
        assert_eq!(structure.atom(id).unwrap().cif_name(), "Si1001");
        assert_eq!(cif_ids_for(&structure, "Si"), (1..=1001).collect::<Vec<_>>());
    }

    #[test]
    fn state_progresses_from_uninitialized_to_named() {
        let mut structure = StructureModel::new(None, Periodicity::NONE);
        assert_eq!(structure.state(), StructureState::Uninitialized);
        structure.add_atom("H", Point3::origin(), "SIO").unwrap();
        assert_eq!(structure.state(), StructureState::Loaded);
        assert_eq!(structure.ensure_node_names(), 1);
        assert_eq!(structure.state(), StructureState::Named);
        assert_eq!(structure.ensure_node_names(), 0);
    }

    #[test]
    fn sorting_reassigns_rows_and_cif_ids_but_keeps_node_names() {
        let mut structure = sample_structure();
        structure.ensure_node_names();
        let before = structure.node_to_cif().keys().cloned().collect::<Vec<_>>();

        structure.sort(SortKey::X);

        let rows: Vec<_> = structure.atoms().map(|(_, a)| a.row).collect();
        assert_eq!(rows, vec![0, 1, 2, 3, 4]);
        let labels: Vec<_> = structure
            .atoms()
            .map(|(_, a)| (a.node_name().unwrap().to_string(), a.cif_name().to_string()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Si_3".to_string(), "Si1".to_string()),
                ("Si_1".to_string(), "Si2".to_string()),
                ("O_2".to_string(), "O1".to_string()),
                ("O_0".to_string(), "O2".to_string()),
                ("O_4".to_string(), "O3".to_string()),
            ]
        );
        let after = structure.node_to_cif().keys().cloned().collect::<Vec<_>>();
        assert_eq!(before, after);
    }

    #[test]
    fn sort_by_ingestion_restores_original_numbering() {
        let mut structure = sample_structure();
        structure.sort(SortKey::Element);
        assert_eq!(cif_ids_for(&structure, "O"), vec![1, 2, 3]);
        structure.sort(SortKey::Ingestion);
        let names: Vec<_> = structure.atoms().map(|(_, a)| a.cif_name().to_string()).collect();
        assert_eq!(names, vec!["O1", "Si1", "O2", "Si2", "O3"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let mut structure = sample_structure();
        structure.sort(SortKey::Residue);
        let serials: Vec<_> = structure.atoms().map(|(_, a)| a.serial).collect();
        assert_eq!(serials, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn bond_records_before_build_is_an_error() {
        let mut structure = sample_structure();
        structure.ensure_node_names();
        assert_eq!(
            structure.bond_records(),
            Err(StructureError::PrematureSerialization)
        );
        assert_eq!(
            structure.geom_bond_block(),
            Err(StructureError::PrematureSerialization)
        );
    }

    #[test]
    fn install_bonds_rejects_unknown_nodes() {
        let mut structure = sample_structure();
        structure.ensure_node_names();
        let mut network = BondNetwork::new();
        network.insert((0, "O_0"), (42, "Xx_42"), 1.0);
        assert_eq!(
            structure.install_bonds(network),
            Err(StructureError::UnknownNode("Xx_42".into()))
        );
        assert_eq!(structure.state(), StructureState::Named);
    }

    #[test]
    fn bond_block_uses_current_cif_labels() {
        let mut structure = sample_structure();
        structure.ensure_node_names();
        let mut network = BondNetwork::new();
        network.insert((1, "Si_1"), (2, "O_2"), 1.0);
        network.insert((0, "O_0"), (1, "Si_1"), 2.0);
        structure.install_bonds(network).unwrap();
        assert_eq!(structure.state(), StructureState::Built);

        let block = structure.geom_bond_block().unwrap();
        let expected = format!(
            "{}{}\n{}\n",
            GEOM_BOND_LOOP_HEADER,
            "O1         Si1            2.0000",
            "Si1        O2             1.0000"
        );
        assert_eq!(block, expected);

        structure.sort(SortKey::X);
        let records = structure.bond_records().unwrap();
        assert_eq!(records[0].label_1, "O2");
        assert_eq!(records[0].label_2, "Si2");
        assert_eq!(records[1].label_1, "Si2");
        assert_eq!(records[1].label_2, "O1");
        assert_eq!(structure.state(), StructureState::Built);
    }

    #[test]
    fn adding_an_atom_discards_the_installed_network() {
        let mut structure = sample_structure();
        structure.ensure_node_names();
        structure.install_bonds(BondNetwork::new()).unwrap();
        assert_eq!(structure.state(), StructureState::Built);

        structure.add_atom("H", Point3::new(5.0, 0.0, 0.0), "SIO").unwrap();
        assert!(structure.bonds().is_none());
        assert_eq!(structure.state(), StructureState::Loaded);
    }

    #[test]
    fn add_atom_validates_element_and_position() {
        let mut structure = StructureModel::new(None, Periodicity::NONE);
        assert_eq!(
            structure.add_atom(" ", Point3::origin(), "SIO"),
            Err(StructureError::MissingField {
                row: 0,
                field: "element"
            })
        );
        assert!(matches!(
            structure.add_atom("C", Point3::new(0.0, f64::INFINITY, 0.0), "SIO"),
            Err(StructureError::InvalidPosition { row: 0, axis: 'y', .. })
        ));
        assert!(structure.is_empty());
    }

    #[test]
    fn sort_key_parses_common_spellings() {
        assert_eq!("element".parse::<SortKey>(), Ok(SortKey::Element));
        assert_eq!("atom_name".parse::<SortKey>(), Ok(SortKey::Element));
        assert_eq!("Z".parse::<SortKey>(), Ok(SortKey::Z));
        assert_eq!("default".parse::<SortKey>(), Ok(SortKey::Ingestion));
        assert!("mass".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Residue.to_string(), "residue");
    }
}
