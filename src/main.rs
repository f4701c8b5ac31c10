use clap::{Parser, Subcommand};
use griglia::cli;
use griglia::error::GrigliaResult;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "griglia")]
#[command(about = "Flatten Griglia volume workbooks and keep the De_Para mapping sheet in sync.")]
#[command(long_about = "Griglia - grid workbook expansion and De_Para synchronization

Reads every .xlsx in a folder, finds the 'Griglia Mondo - Volumi' (or
'Grid World - Volume') sheet, and writes one row per data row and column
group to Expanded_Mapped_File.xlsx. With a De_Para workbook, new codes are
matched against its 'Coded' sheet and appended to 'tb_de_para'.

COMMANDS:
  run      - Expand a folder and synchronize De_Para
  expand   - Expand a folder only
  sync     - Synchronize De_Para from an existing expanded file
  inspect  - Show the grid header of one workbook

EXAMPLES:
  griglia run downloads/ out/ --translation De_Para.xlsx
  griglia run --config griglia.yaml --json
  griglia inspect downloads/226_Griglia.xlsx

LOGGING:
  Set RUST_LOG (e.g. RUST_LOG=griglia=debug) or pass --verbose.")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Expand every workbook in a folder and synchronize De_Para.

Writes <output>/Expanded_Mapped_File.xlsx. When --translation is given, the
'tb_de_para' sheet of that workbook is extended with new codes. If the
workbook is locked, the table is saved to <name>_updated_tb_de_para.xlsx
next to it instead.

Folders may also come from a YAML config file (--config); command-line
values take precedence.")]
    /// Expand a folder of grid workbooks and synchronize De_Para
    Run {
        /// Folder containing the grid workbooks
        input: Option<PathBuf>,

        /// Folder for Expanded_Mapped_File.xlsx
        output: Option<PathBuf>,

        /// De_Para workbook with 'Coded' and 'tb_de_para' sheets
        #[arg(short, long, env = "GRIGLIA_DE_PARA")]
        translation: Option<PathBuf>,

        /// YAML run configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Expand a folder of grid workbooks into one .xlsx file
    Expand {
        /// Folder containing the grid workbooks
        input: PathBuf,

        /// Output .xlsx file
        output: PathBuf,
    },

    /// Synchronize De_Para from an existing Expanded_Mapped workbook
    Sync {
        /// Workbook with an 'Expanded_Mapped' sheet
        expanded: PathBuf,

        /// De_Para workbook
        translation: PathBuf,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the sheet, model and column groups of one workbook
    Inspect {
        /// Grid workbook (.xlsx)
        workbook: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "griglia=debug" } else { "griglia=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> GrigliaResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            input,
            output,
            translation,
            config,
            json,
        } => cli::run(input, output, translation, config, json),

        Commands::Expand { input, output } => cli::expand(input, output),

        Commands::Sync {
            expanded,
            translation,
            json,
        } => cli::sync(expanded, translation, json),

        Commands::Inspect { workbook } => cli::inspect(workbook),
    }
}
