use super::defaults::DefaultsConfig;
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::{ConnectArgs, OutputFormat};
use crate::error::{CliError, Result};
use crate::utils::parser;
use clap::ValueEnum;
use cifbond::core::models::structure::SortKey;
use cifbond::core::params::radii::CovalentRadiusTable;
use cifbond::engine::config::BondConfigBuilder;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

const RADIUS_OVERRIDE_PREFIX: &str = "radii.overrides.";

pub fn build_config(args: &ConnectArgs) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let bonds_file = file_config.bonds.take().unwrap_or_default();
    let tolerance = args
        .tolerance
        .or(bonds_file.tolerance)
        .unwrap_or(defaults.tolerance);

    let pairs = if !args.pairs.is_empty() {
        Some(parser::parse_pairs(&args.pairs).map_err(|e| CliError::Argument(e.to_string()))?)
    } else if let Some(file_pairs) = &bonds_file.pairs {
        Some(parser::parse_pairs(file_pairs).map_err(|e| CliError::Config(e.to_string()))?)
    } else {
        None
    };

    let mut bond_config = BondConfigBuilder::new().tolerance(tolerance);
    if let Some(pairs) = pairs {
        bond_config = bond_config.pairs(pairs);
    }
    let bond_config = bond_config
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let radii_file = file_config.radii.take().unwrap_or_default();
    let radii = load_radii(
        args.radii.as_deref().or(radii_file.file.as_deref()),
        &radii_file.overrides,
    )?;

    let structure_file = file_config.structure.take().unwrap_or_default();
    let sort_by = match args.sort_by.as_deref().or(structure_file.sort_by.as_deref()) {
        Some(key) => Some(key.parse::<SortKey>().map_err(CliError::Argument)?),
        None => defaults.sort_by,
    };
    let periodic = !args.no_pbc && structure_file.pbc.unwrap_or(defaults.periodic);

    let output_file = file_config.output.take().unwrap_or_default();
    let output_format = resolve_output_format(
        args.format,
        output_file.format.as_deref(),
        &args.output,
    )?;
    let print_bonds = args.print_bonds || output_file.print_bonds.unwrap_or(defaults.print_bonds);

    let field_defaults = file_config.defaults.take().unwrap_or_default();
    field_defaults
        .validate()
        .map_err(|e| CliError::Config(e.to_string()))?;

    debug!(
        tolerance,
        %output_format,
        periodic,
        radii = radii.len(),
        "Resolved connect configuration."
    );

    Ok(AppConfig {
        input_path: args.input.clone(),
        output_path: args.output.clone(),
        output_format,
        sort_by,
        periodic,
        print_bonds,
        radii,
        bond_config,
        field_defaults,
    })
}

/// The built-in radius table, overlaid with `file` and then with `overrides`.
pub fn load_radii(file: Option<&Path>, overrides: &BTreeMap<String, f64>) -> Result<CovalentRadiusTable> {
    let mut table = CovalentRadiusTable::default();
    if let Some(path) = file {
        let loaded = CovalentRadiusTable::load(path).map_err(|e| CliError::parsing(path, e))?;
        debug!(path = %path.display(), entries = loaded.len(), "Loaded covalent radii.");
        table.extend(&loaded);
    }
    for (element, &radius) in overrides {
        table
            .insert(element, radius)
            .map_err(|e| CliError::Config(e.to_string()))?;
    }
    Ok(table)
}

fn resolve_output_format(
    cli_arg: Option<OutputFormat>,
    file_arg: Option<&str>,
    output_path: &Path,
) -> Result<OutputFormat> {
    if let Some(format) = cli_arg {
        return Ok(format);
    }
    if let Some(name) = file_arg {
        return OutputFormat::from_str(name, true)
            .map_err(|_| CliError::Config(format!("Unknown output format '{}'", name)));
    }
    OutputFormat::from_path(output_path).ok_or_else(|| {
        CliError::Argument(format!(
            "Cannot infer an output format from '{}'; pass --format",
            output_path.display()
        ))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    if set_values.is_empty() {
        return Ok(config);
    }
    for kv_pair in set_values {
        let (key, value_str) =
            parser::parse_assignment(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;
        let invalid = |kind: &str| {
            CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value_str))
        };

        match key {
            "bonds.tolerance" => {
                config.bonds.get_or_insert_with(Default::default).tolerance =
                    Some(value_str.parse().map_err(|_| invalid("float"))?);
            }
            "bonds.pairs" => {
                config.bonds.get_or_insert_with(Default::default).pairs =
                    Some(vec![value_str.to_string()]);
            }
            "radii.file" => {
                config.radii.get_or_insert_with(Default::default).file =
                    Some(PathBuf::from(value_str));
            }
            "structure.sort-by" => {
                config.structure.get_or_insert_with(Default::default).sort_by =
                    Some(value_str.to_string());
            }
            "structure.pbc" => {
                config.structure.get_or_insert_with(Default::default).pbc =
                    Some(parser::parse_bool(value_str).map_err(|_| invalid("boolean"))?);
            }
            "output.format" => {
                config.output.get_or_insert_with(Default::default).format =
                    Some(value_str.to_string());
            }
            "output.print-bonds" => {
                config.output.get_or_insert_with(Default::default).print_bonds =
                    Some(parser::parse_bool(value_str).map_err(|_| invalid("boolean"))?);
            }
            "defaults.residue-name" => {
                config
                    .defaults
                    .get_or_insert_with(Default::default)
                    .residue_name = value_str.to_string();
            }
            _ if key.starts_with(RADIUS_OVERRIDE_PREFIX) => {
                let element = &key[RADIUS_OVERRIDE_PREFIX.len()..];
                let radius = value_str.parse().map_err(|_| invalid("float"))?;
                config
                    .radii
                    .get_or_insert_with(Default::default)
                    .overrides
                    .insert(element.to_string(), radius);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cifbond::engine::config::{ElementPair, PairSelection};
    use std::fs;
    use tempfile::tempdir;

    fn base_connect_args() -> ConnectArgs {
        ConnectArgs {
            input: PathBuf::from("in.cif"),
            output: PathBuf::from("out.cif"),
            ..Default::default()
        }
    }

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("cifbond.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_config_file() {
        let app = build_config(&base_connect_args()).expect("build ok");

        assert_eq!(app.output_format, OutputFormat::Cif);
        assert_eq!(app.bond_config.tolerance, DefaultsConfig::default().tolerance);
        assert_eq!(app.bond_config.pairs, PairSelection::AllTableElements);
        assert!(app.periodic);
        assert!(!app.print_bonds);
        assert!(app.sort_by.is_none());
        assert_eq!(app.radii, CovalentRadiusTable::default());
        assert_eq!(app.field_defaults.residue_name, "SIO");
    }

    #[test]
    fn config_file_values_are_used() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
            [bonds]
            tolerance = 0.35
            pairs = ["Si-O", "O-O"]

            [radii.overrides]
            Si = 1.2

            [structure]
            sort-by = "element"
            pbc = false

            [output]
            format = "pdb"
            print-bonds = true

            [defaults]
            residue-name = "QTZ"
            "#,
        );
        let mut args = base_connect_args();
        args.config = Some(path);

        let app = build_config(&args).expect("build ok");

        assert_eq!(app.bond_config.tolerance, 0.35);
        assert_eq!(
            app.bond_config.pairs,
            PairSelection::List(vec![ElementPair::new("O", "Si"), ElementPair::new("O", "O")])
        );
        assert_eq!(app.radii.get("Si"), Some(1.2));
        assert_eq!(app.sort_by, Some(SortKey::Element));
        assert!(!app.periodic);
        assert_eq!(app.output_format, OutputFormat::Pdb);
        assert!(app.print_bonds);
        assert_eq!(app.field_defaults.residue_name, "QTZ");
    }

    #[test]
    fn cli_flags_override_file_and_set_values() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[bonds]\ntolerance = 0.35\npairs = [\"O-O\"]\n[output]\nformat = \"gro\"\n",
        );
        let mut args = base_connect_args();
        args.config = Some(path);
        args.set_values = vec!["bonds.tolerance=0.4".into()];
        args.tolerance = Some(0.1);
        args.pairs = vec!["Si-O".into()];
        args.format = Some(OutputFormat::Xyz);

        let app = build_config(&args).expect("build ok");

        assert_eq!(app.bond_config.tolerance, 0.1);
        assert_eq!(
            app.bond_config.pairs,
            PairSelection::List(vec![ElementPair::new("Si", "O")])
        );
        assert_eq!(app.output_format, OutputFormat::Xyz);
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[bonds]\ntolerance = 0.35\n");
        let mut args = base_connect_args();
        args.config = Some(path);
        args.set_values = vec![
            "bonds.tolerance=0.45".into(),
            "bonds.pairs=Si-O,O-O".into(),
            "structure.sort-by=z".into(),
            "structure.pbc=no".into(),
            "output.print-bonds=yes".into(),
            "radii.overrides.Xx=0.9".into(),
            "defaults.residue-name=MFI".into(),
        ];

        let app = build_config(&args).expect("build ok");

        assert!((app.bond_config.tolerance - 0.45).abs() < 1e-12);
        assert_eq!(
            app.bond_config.pairs,
            PairSelection::List(vec![ElementPair::new("O", "Si"), ElementPair::new("O", "O")])
        );
        assert_eq!(app.sort_by, Some(SortKey::Z));
        assert!(!app.periodic);
        assert!(app.print_bonds);
        assert_eq!(app.radii.get("Xx"), Some(0.9));
        assert_eq!(app.field_defaults.residue_name, "MFI");
    }

    #[test]
    fn no_pbc_flag_wins_over_file() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[structure]\npbc = true\n");
        let mut args = base_connect_args();
        args.config = Some(path);
        args.no_pbc = true;

        assert!(!build_config(&args).unwrap().periodic);
    }

    #[test]
    fn radii_file_overlays_the_built_in_table() {
        let dir = tempdir().unwrap();
        let radii_path = dir.path().join("radii.csv");
        fs::write(&radii_path, "element,radius\nO, 0.70\nXx,1.00\n").unwrap();
        let mut args = base_connect_args();
        args.radii = Some(radii_path);

        let app = build_config(&args).expect("build ok");

        assert_eq!(app.radii.get("O"), Some(0.70));
        assert_eq!(app.radii.get("Xx"), Some(1.00));
        assert_eq!(app.radii.get("Si"), CovalentRadiusTable::default().get("Si"));
    }

    #[test]
    fn unknown_keys_and_bad_values_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[bonds]\ncutoff = 2.0\n");
        let mut args = base_connect_args();
        args.config = Some(path);
        assert!(matches!(build_config(&args), Err(CliError::FileParsing { .. })));

        let mut args = base_connect_args();
        args.set_values = vec!["bonds.cutoff=2.0".into()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_connect_args();
        args.set_values = vec!["bonds.tolerance=wide".into()];
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_connect_args();
        args.tolerance = Some(-0.5);
        assert!(matches!(build_config(&args), Err(CliError::Config(_))));

        let mut args = base_connect_args();
        args.pairs = vec!["SiO".into()];
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));

        let mut args = base_connect_args();
        args.sort_by = Some("mass".into());
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));
    }

    #[test]
    fn output_format_must_be_resolvable() {
        let mut args = base_connect_args();
        args.output = PathBuf::from("out.dat");
        assert!(matches!(build_config(&args), Err(CliError::Argument(_))));

        args.set_values = vec!["output.format=gro".into()];
        assert_eq!(build_config(&args).unwrap().output_format, OutputFormat::Gro);
    }
}
