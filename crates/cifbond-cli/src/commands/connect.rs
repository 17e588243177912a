use crate::cli::{ConnectArgs, OutputFormat};
use crate::config::{self, AppConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use cifbond::{
    core::{
        io::{
            cif::{CifFile, CifMetadata},
            format::{RowFormat, write_table},
            traits::StructureFile,
            xyz::XyzFile,
        },
        models::{builder::IngestWarning, cell::Periodicity, structure::StructureModel},
    },
    engine::{error::EngineError, progress::ProgressReporter},
    workflows,
};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

/// What a `connect` run produced, for the final console summary.
#[derive(Debug)]
pub struct ConnectSummary {
    pub atoms: usize,
    pub bonds: usize,
    pub warnings: Vec<String>,
    /// The geometric bond loop, when it was requested for printing.
    pub bond_block: Option<String>,
}

struct LoadedInput {
    structure: StructureModel,
    data_block: String,
    warnings: Vec<IngestWarning>,
}

pub fn run(args: ConnectArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app_config = config::build_config(&args)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Perceiving bonds in {}...", app_config.input_path.display());
    let summary = execute(&app_config, &reporter)?;

    for warning in &summary.warnings {
        println!("  Warning: {}", warning);
    }
    if let Some(block) = &summary.bond_block {
        print!("{}", block);
    }
    println!(
        "✓ {} bond(s) among {} atom(s) written to: {}",
        summary.bonds,
        summary.atoms,
        app_config.output_path.display()
    );
    Ok(())
}

/// Reads the input, builds and installs the bond network, and writes the output.
pub fn execute(app_config: &AppConfig, reporter: &ProgressReporter) -> Result<ConnectSummary> {
    info!("Loading input structure from {:?}", &app_config.input_path);
    let LoadedInput {
        mut structure,
        data_block,
        warnings: ingest_warnings,
    } = read_input(&app_config.input_path, app_config)?;

    let mut warnings = Vec::new();
    if let Some(first) = ingest_warnings.first() {
        warnings.push(match ingest_warnings.len() {
            1 => first.to_string(),
            n => format!("{} (and {} more row(s))", first, n - 1),
        });
    }

    if !app_config.periodic && structure.periodicity().any() {
        info!("Periodic boundaries disabled by configuration.");
        structure.set_periodicity(Periodicity::NONE);
    }
    if let Some(key) = app_config.sort_by {
        info!(%key, "Sorting atom rows.");
        structure.sort(key);
    }

    info!("Invoking the connect workflow...");
    let report = workflows::connect::run(
        &mut structure,
        &app_config.radii,
        &app_config.bond_config,
        reporter,
    )?;
    for warning in &report.warnings {
        warn!("{}", warning);
        warnings.push(warning.to_string());
    }
    for pair in &report.skipped_pairs {
        info!(%pair, "Pair skipped: no atoms on one side.");
    }

    let bond_block = if app_config.print_bonds {
        Some(structure.geom_bond_block().map_err(EngineError::from)?)
    } else {
        None
    };

    info!(
        "Writing {} output to {:?}",
        app_config.output_format, &app_config.output_path
    );
    write_output(&structure, &data_block, app_config)?;

    Ok(ConnectSummary {
        atoms: structure.len(),
        bonds: report.bond_count,
        warnings,
        bond_block,
    })
}

fn read_input(path: &Path, app_config: &AppConfig) -> Result<LoadedInput> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let defaults = &app_config.field_defaults;

    match extension.as_deref() {
        Some("cif") => {
            let (structure, metadata) =
                CifFile::read_from_path(path, defaults).map_err(|e| CliError::parsing(path, e))?;
            Ok(LoadedInput {
                structure,
                data_block: metadata.data_block,
                warnings: metadata.warnings,
            })
        }
        Some("xyz") | Some("extxyz") => {
            let (structure, metadata) =
                XyzFile::read_from_path(path, defaults).map_err(|e| CliError::parsing(path, e))?;
            Ok(LoadedInput {
                structure,
                data_block: String::new(),
                warnings: metadata.warnings,
            })
        }
        _ => Err(CliError::Argument(format!(
            "Unsupported input format for '{}'; expected .cif or .xyz",
            path.display()
        ))),
    }
}

fn write_output(structure: &StructureModel, data_block: &str, app_config: &AppConfig) -> Result<()> {
    let path = &app_config.output_path;
    match app_config.output_format {
        OutputFormat::Cif => {
            let metadata = CifMetadata {
                data_block: data_block.to_string(),
                ..Default::default()
            };
            CifFile::write_to_path(structure, &metadata, path).map_err(|e| CliError::writing(path, e))
        }
        OutputFormat::Xyz => {
            XyzFile::write_structure_to_path(structure, path).map_err(|e| CliError::writing(path, e))
        }
        OutputFormat::Pdb | OutputFormat::Gro => {
            let row_format = if app_config.output_format == OutputFormat::Pdb {
                RowFormat::Pdb
            } else {
                RowFormat::Gro
            };
            let mut writer = BufWriter::new(File::create(path)?);
            write_table(structure, row_format, &app_config.field_defaults, &mut writer)
                .map_err(|e| CliError::writing(path, e))?;
            writer.flush()?;
            Ok(())
        }
    }
}
