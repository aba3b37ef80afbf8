mod commands;
mod output;

use clap::{Parser, Subcommand};
use commands::ConfigArgs;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "masterfile",
    version,
    about = "Merge extracted equipment drawing data into the masterfile workbook and slide deck"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split raw material strings into spec and grade
    Material {
        /// Material text as written on the drawing, e.g. "SA-516-70"
        #[arg(required = true)]
        raw: Vec<String>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Show the template part pattern for a drawing
    Pattern {
        /// Drawing file name, "<PMT NO> - <EQUIPMENT NO>.pdf"
        drawing: String,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Inspect and validate equipment rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Print the instruction sent to the extraction oracle
    Prompt {
        #[command(subcommand)]
        kind: PromptKind,
    },
    /// Append one drawing from recorded oracle answers
    Append {
        drawing: String,

        /// Output workbook, created from the template when missing
        #[arg(short, long, value_name = "FILE")]
        workbook: PathBuf,

        /// Oracle answer for the design-data region
        #[arg(long, value_name = "FILE")]
        design: Option<PathBuf>,

        /// Oracle answer for a BOM region (repeatable, concatenated in order)
        #[arg(long, value_name = "FILE")]
        bom: Vec<PathBuf>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Refresh the slide deck from the output workbook
    Sync {
        #[arg(short, long, value_name = "FILE")]
        workbook: PathBuf,

        /// Slide deck, created from the deck template when missing
        #[arg(short, long, value_name = "FILE")]
        deck: PathBuf,

        /// New main picture for a drawing's slide, as DRAWING=IMAGE (repeatable)
        #[arg(short, long = "image", value_name = "DRAWING=IMAGE", value_parser = parse_image_arg)]
        images: Vec<(String, PathBuf)>,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Run a batch of drawing jobs with recorded oracle answers
    Process {
        /// JSON array of drawing jobs
        jobs: PathBuf,

        /// Directory of recorded answers, "<drawing stem>.<region>.json"
        #[arg(short, long, value_name = "DIR")]
        answers: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        workbook: PathBuf,

        #[arg(short, long, value_name = "FILE")]
        deck: PathBuf,

        /// Output format: table (default) or json
        #[arg(short, long, default_value = "table")]
        output: String,
    },
}

#[derive(Subcommand)]
enum RulesAction {
    /// List equipment with rules
    List,
    /// Show the rule for a drawing
    Show { drawing: String },
    /// Validate a custom rule file
    Validate {
        /// Path to JSON rule file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum PromptKind {
    /// Design-data instruction
    Design { drawing: String },
    /// BOM instruction
    Bom { drawing: String },
}

fn parse_image_arg(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((drawing, image)) if !drawing.trim().is_empty() && !image.trim().is_empty() => {
            Ok((drawing.trim().to_string(), PathBuf::from(image.trim())))
        }
        _ => Err(format!("expected DRAWING=IMAGE, got '{s}'")),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "masterfile=debug,masterfile_core=debug"
    } else {
        "masterfile=info,masterfile_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = &cli.config;
    let result = match cli.command {
        Commands::Material { raw, output } => commands::material::run(&raw, &output),
        Commands::Pattern { drawing, output } => commands::pattern::run(config, &drawing, &output),
        Commands::Rules { action } => match action {
            RulesAction::List => commands::rules::list(config),
            RulesAction::Show { drawing } => commands::rules::show(config, &drawing),
            RulesAction::Validate { file } => commands::rules::validate(&file),
        },
        Commands::Prompt { kind } => match kind {
            PromptKind::Design { drawing } => commands::prompt::design(config, &drawing),
            PromptKind::Bom { drawing } => commands::prompt::bom(config, &drawing),
        },
        Commands::Append {
            drawing,
            workbook,
            design,
            bom,
            output,
        } => commands::append::run(config, &drawing, &workbook, design, &bom, &output),
        Commands::Sync {
            workbook,
            deck,
            images,
            output,
        } => commands::sync::run(config, &workbook, &deck, &images, &output),
        Commands::Process {
            jobs,
            answers,
            workbook,
            deck,
            output,
        } => commands::process::run(config, &jobs, &answers, workbook, deck, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
