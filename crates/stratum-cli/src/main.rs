//! stratum CLI - G-code from partitioned layers
//!
//! Reads a JSON layer file (the output of a slicing stage) and an optional
//! options file, and writes the G-code program.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use stratum_slicer::{Options, PartitionedLayer};
use stratum_slicer_gcode::Generator;
use tracing::info;

#[derive(Parser)]
#[command(name = "stratum")]
#[command(about = "Generate G-code from partitioned layers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate G-code from a layer file
    Generate {
        /// JSON file with the layers, bottom layer first
        #[arg(short, long)]
        layers: PathBuf,
        /// Options file (.toml or .json); defaults are used when omitted
        #[arg(long)]
        options: Option<PathBuf>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the default options
    Defaults {
        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Toml)]
        format: Format,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Format {
    Toml,
    Json,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            layers,
            options,
            output,
        } => {
            generate(&layers, options.as_deref(), output.as_deref())?;
        }
        Commands::Defaults { format } => {
            print!("{}", render_defaults(format)?);
        }
    }

    Ok(())
}

/// Log to stderr so G-code on stdout stays clean. `RUST_LOG` overrides the
/// default `info` level.
fn init_logging() {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn generate(layers: &Path, options: Option<&Path>, output: Option<&Path>) -> Result<()> {
    let options = match options {
        Some(path) => load_options(path)?,
        None => Options::default(),
    };

    let json = fs::read_to_string(layers)
        .with_context(|| format!("failed to read {}", layers.display()))?;
    let layers: Vec<PartitionedLayer> = serde_json::from_str(&json)
        .with_context(|| format!("failed to parse layers from {}", layers.display()))?;
    info!(layers = layers.len(), "loaded layers");

    let gcode = Generator::new(options).generate(&layers)?;

    match output {
        Some(path) => {
            fs::write(path, &gcode)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "wrote G-code");
        }
        None => {
            std::io::stdout().write_all(gcode.as_bytes())?;
        }
    }
    Ok(())
}

fn load_options(path: &Path) -> Result<Options> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = match ext.to_lowercase().as_str() {
        "json" => Format::Json,
        "toml" | "" => Format::Toml,
        _ => anyhow::bail!("Unknown options format: {}", ext),
    };
    parse_options(&text, format).with_context(|| format!("invalid options in {}", path.display()))
}

fn parse_options(text: &str, format: Format) -> Result<Options> {
    let options: Options = match format {
        Format::Toml => toml::from_str(text)?,
        Format::Json => serde_json::from_str(text)?,
    };
    options.validate()?;
    Ok(options)
}

fn render_defaults(format: Format) -> Result<String> {
    let options = Options::default();
    Ok(match format {
        Format::Toml => toml::to_string(&options)?,
        Format::Json => serde_json::to_string_pretty(&options)? + "\n",
    })
}
