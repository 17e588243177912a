use crate::core::models::structure::StructureModel;
use crate::core::params::radii::CovalentRadiusTable;
use crate::engine::builder::BondGraphBuilder;
use crate::engine::config::BondConfig;
use crate::engine::error::EngineError;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::report::BuildReport;
use tracing::{info, instrument};

/// Builds the bond network of `structure` and installs it, replacing any previous one.
///
/// On error the structure keeps whatever network it had before the call.
#[instrument(skip_all, name = "connect_workflow")]
pub fn run(
    structure: &mut StructureModel,
    radii: &CovalentRadiusTable,
    config: &BondConfig,
    reporter: &ProgressReporter,
) -> Result<BuildReport, EngineError> {
    info!(
        atoms = structure.len(),
        periodicity = %structure.periodicity(),
        tolerance = config.tolerance,
        "Connecting structure."
    );
    reporter.message(format!("Connecting {} atoms", structure.len()));

    let outcome = BondGraphBuilder::new(radii, config).build(structure, reporter)?;
    structure.install_bonds(outcome.network)?;

    let report = outcome.report;
    if report.has_warnings() {
        reporter.report(Progress::Message(format!(
            "{} element(s) without a covalent radius",
            report.warnings.len()
        )));
    }
    info!(bonds = report.bond_count, "Bond network installed.");
    Ok(report)
}
