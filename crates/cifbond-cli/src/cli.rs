use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fmt;
use std::path::{Path, PathBuf};

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "cifbond - Perceive covalent bonds in periodic orthorhombic crystal structures and write them as CIF geometric bond loops.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build the bond network of a structure and write it out.
    Connect(ConnectArgs),
    /// Print the effective covalent-radius table.
    Radii(RadiiArgs),
}

/// Arguments for the `connect` subcommand.
#[derive(Args, Debug, Default)]
pub struct ConnectArgs {
    // --- Core Arguments ---
    /// Path to the input structure (.cif or extended .xyz).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the output structure (.cif, .xyz, .pdb or .gro).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    // --- Bond Overrides ---
    /// Distance added to the sum of covalent radii, in Angstroms.
    #[arg(short, long, value_name = "FLOAT")]
    pub tolerance: Option<f64>,

    /// Restrict the build to element pairs such as 'Si-O'.
    /// Can be used multiple times or given as a comma-separated list.
    #[arg(short = 'p', long = "pair", value_name = "A-B")]
    pub pairs: Vec<String>,

    /// Covalent-radius file (.toml or .csv) whose entries override the built-in table.
    #[arg(long, value_name = "PATH")]
    pub radii: Option<PathBuf>,

    // --- Structure Overrides ---
    /// Reorder atom rows before writing (ingestion, element, residue, x, y, z).
    #[arg(long, value_name = "KEY")]
    pub sort_by: Option<String>,

    /// Ignore periodic boundaries even if the input declares a cell.
    #[arg(long)]
    pub no_pbc: bool,

    // --- Output Overrides ---
    /// Output format. Inferred from the output extension when omitted.
    #[arg(short, long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Also print the geometric bond loop to standard output.
    #[arg(long)]
    pub print_bonds: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S bonds.tolerance=0.3
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `radii` subcommand.
#[derive(Args, Debug, Default)]
pub struct RadiiArgs {
    /// Covalent-radius file (.toml or .csv) whose entries override the built-in table.
    #[arg(long, value_name = "PATH")]
    pub radii: Option<PathBuf>,

    /// Only print these elements.
    #[arg(short, long = "element", value_name = "SYMBOL")]
    pub elements: Vec<String>,
}

/// Structure formats the `connect` command can write.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// P1 CIF with the geometric bond loop.
    Cif,
    /// Extended XYZ with lattice and pbc header.
    Xyz,
    /// PDB atom records.
    Pdb,
    /// GROMACS coordinate file.
    Gro,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "cif" => Some(OutputFormat::Cif),
            "xyz" | "extxyz" => Some(OutputFormat::Xyz),
            "pdb" => Some(OutputFormat::Pdb),
            "gro" => Some(OutputFormat::Gro),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Cif => "cif",
            OutputFormat::Xyz => "xyz",
            OutputFormat::Pdb => "pdb",
            OutputFormat::Gro => "gro",
        };
        f.write_str(name)
    }
}
