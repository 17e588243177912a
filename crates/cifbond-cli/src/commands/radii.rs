use crate::cli::RadiiArgs;
use crate::config;
use crate::error::{CliError, Result};
use cifbond::core::params::radii::CovalentRadiusTable;
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::info;

pub fn run(args: RadiiArgs) -> Result<()> {
    let table = config::load_radii(args.radii.as_deref(), &BTreeMap::new())?;
    info!(entries = table.len(), "Effective covalent-radius table loaded.");
    print!("{}", render_table(&table, &args.elements)?);
    Ok(())
}

/// Formats `table` as aligned `element radius` lines, limited to `elements` when non-empty.
pub fn render_table(table: &CovalentRadiusTable, elements: &[String]) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(out, "{:<8} {:>10}", "Element", "Radius (Å)");

    if elements.is_empty() {
        for (element, radius) in table.iter() {
            let _ = writeln!(out, "{:<8} {:>10.3}", element, radius);
        }
        return Ok(out);
    }

    for element in elements {
        let radius = table.get(element).ok_or_else(|| {
            CliError::Argument(format!("Element '{}' is not in the radius table", element))
        })?;
        let _ = writeln!(out, "{:<8} {:>10.3}", element, radius);
    }
    Ok(out)
}
