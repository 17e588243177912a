use nalgebra::Point3;

/// One row of the atom table.
///
/// An atom carries two independent identities:
///
/// - `node_name` keys the atom in bond graphs and distance maps. It is derived from the
///   element symbol and the permanent ingestion `serial`, assigned once, and never changes
///   afterwards, no matter how the table is reordered.
/// - `cif_name` labels the atom in serialized output. It is the element symbol followed by a
///   1-based per-element counter (`cif_id`) over the *current* row order, so it is
///   recomputed whenever rows move.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// Chemical element symbol (e.g. "Si", "O").
    pub element: String,
    /// Cartesian position in Angstroms.
    pub position: Point3<f64>,
    /// Residue label used by tabular writers.
    pub residue: String,
    /// Optional partial charge in elementary charge units.
    pub charge: Option<f64>,
    /// Permanent index assigned at ingestion.
    pub serial: usize,
    /// Current row id, `0..N` in table order.
    pub row: usize,
    pub(crate) node_name: Option<String>,
    pub(crate) cif_id: usize,
    pub(crate) cif_name: String,
}

impl AtomRecord {
    pub(crate) fn new(element: &str, position: Point3<f64>, residue: &str, serial: usize) -> Self {
        Self {
            element: element.to_string(),
            position,
            residue: residue.to_string(),
            charge: None,
            serial,
            row: serial,
            node_name: None,
            cif_id: 0,
            cif_name: String::new(),
        }
    }

    /// The graph-key identity, or `None` before the first naming pass.
    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    pub fn cif_id(&self) -> usize {
        self.cif_id
    }

    pub fn cif_name(&self) -> &str {
        &self.cif_name
    }

    pub(crate) fn assign_node_name(&mut self) -> bool {
        if self.node_name.is_some() {
            return false;
        }
        self.node_name = Some(node_name_for(&self.element, self.serial));
        true
    }

    pub(crate) fn assign_cif_id(&mut self, cif_id: usize) {
        self.cif_id = cif_id;
        self.cif_name = cif_name_for(&self.element, cif_id);
    }
}

pub fn node_name_for(element: &str, serial: usize) -> String {
    format!("{}_{}", element, serial)
}

pub fn cif_name_for(element: &str, cif_id: usize) -> String {
    format!("{}{}", element, cif_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_starts_unnamed() {
        let atom = AtomRecord::new("Si", Point3::new(1.0, 2.0, 3.0), "SIO", 4);
        assert_eq!(atom.element, "Si");
        assert_eq!(atom.serial, 4);
        assert_eq!(atom.row, 4);
        assert!(atom.node_name().is_none());
        assert_eq!(atom.cif_id(), 0);
        assert_eq!(atom.cif_name(), "");
        assert!(atom.charge.is_none());
    }

    #[test]
    fn node_name_is_assigned_only_once() {
        let mut atom = AtomRecord::new("O", Point3::origin(), "SIO", 7);
        assert!(atom.assign_node_name());
        assert_eq!(atom.node_name(), Some("O_7"));

        atom.serial = 99;
        assert!(!atom.assign_node_name());
        assert_eq!(atom.node_name(), Some("O_7"));
    }

    #[test]
    fn cif_identity_follows_assigned_counter() {
        let mut atom = AtomRecord::new("Si", Point3::origin(), "SIO", 0);
        atom.assign_cif_id(3);
        assert_eq!(atom.cif_id(), 3);
        assert_eq!(atom.cif_name(), "Si3");
        atom.assign_cif_id(1);
        assert_eq!(atom.cif_name(), "Si1");
    }

    #[test]
    fn name_helpers_format_as_expected() {
        assert_eq!(node_name_for("H", 0), "H_0");
        assert_eq!(cif_name_for("Al", 12), "Al12");
    }
}
