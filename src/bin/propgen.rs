//! Property Generator CLI
//!
//! Generates the style property classes, their tests, QML bindings, build
//! manifests and stylesheet listing from the property schema.
//!
//! Usage:
//!   propgen generate
//!   propgen check --diff
//!   propgen --schema properties.yml dump

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use propgen::{GeneratorConfig, Generator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "propgen")]
#[command(about = "Generate style property classes from a property schema")]
struct Cli {
    /// Configuration file, applied on top of the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Schema file (overrides the configured path)
    #[arg(short, long, global = true)]
    schema: Option<PathBuf>,

    /// Output root (overrides the configured root)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Regenerate every output file
    Generate {
        /// List the files that would be written without touching the disk
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that the generated files are up to date
    Check {
        /// Print a diff for every changed file
        #[arg(long)]
        diff: bool,
    },

    /// Print the resolved schema as JSON
    Dump,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = GeneratorConfig::load_from(cli.config.as_deref())
        .context("Failed to load configuration")?;

    let cwd = std::env::current_dir()?;
    if let Some(schema) = cli.schema {
        config.schema.path = cwd.join(schema);
    }
    if let Some(output) = cli.output {
        config.output.root = cwd.join(output);
    }

    let schema_path = config.schema_path();
    let registry = propgen::load_schema(&config)
        .with_context(|| format!("Failed to resolve schema {}", schema_path.display()))?;

    match cli.command {
        Commands::Generate { dry_run } => {
            let generator = Generator::new(&config)?;
            let files = generator.render_all(&registry)?;

            if dry_run {
                for file in &files {
                    println!("{}", file.path.display());
                }
                println!("\n{} files from {} groups (dry run)", files.len(), registry.len());
                return Ok(());
            }

            generator
                .layout()
                .write(&files)
                .context("Failed to write generated files")?;
            println!("Generated {} files from {} groups", files.len(), registry.len());
            Ok(())
        }

        Commands::Check { diff } => {
            let generator = Generator::new(&config)?;
            let files = generator.render_all(&registry)?;
            let report = generator.layout().check(&files)?;

            if report.is_clean() {
                println!("Generated files are up to date ({} files)", files.len());
                return Ok(());
            }

            for changed in &report.changed {
                println!("changed: {}", changed.path.display());
                if diff {
                    println!("{}", changed.diff);
                }
            }
            for path in &report.missing {
                println!("missing: {}", path.display());
            }
            for path in &report.stale {
                println!("stale:   {}", path.display());
            }
            println!("\nGenerated files are out of date, run `propgen generate`");
            std::process::exit(1);
        }

        Commands::Dump => {
            println!("{}", serde_json::to_string_pretty(&registry)?);
            Ok(())
        }
    }
}
