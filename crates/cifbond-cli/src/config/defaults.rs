use cifbond::core::models::structure::SortKey;
use cifbond::engine::config::DEFAULT_TOLERANCE;

pub struct DefaultsConfig {
    pub tolerance: f64,
    pub sort_by: Option<SortKey>,
    pub periodic: bool,
    pub print_bonds: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            sort_by: None,
            periodic: true,
            print_bonds: false,
        }
    }
}
