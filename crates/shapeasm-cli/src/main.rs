//! shapeasm CLI - reconstruct 3D shapes from shape assembly source

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shapeasm_import::{import_file, ImportConfig, ShapeFile};
use shapeasm_source::{classify_file, ChunkKind, FileId};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Config file picked up from the working directory when `--config` is absent.
const DEFAULT_CONFIG: &str = "shapeasm.toml";

#[derive(Parser)]
#[command(name = "shapeasm")]
#[command(about = "Reconstruct 3D shapes from macro-driven assembly source", long_about = None)]
struct Cli {
    /// Log more (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import shapes from a source file
    Import {
        /// Shape source file
        file: PathBuf,
        /// Include file to harvest constants from (repeatable)
        #[arg(short, long = "include")]
        includes: Vec<PathBuf>,
        /// TOML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Write the imported shapes as JSON
        #[arg(long)]
        json: Option<PathBuf>,
    },
    /// Show chunk and shape counts for a source file
    Info {
        /// Shape source file
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Import {
            file,
            includes,
            config,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            config.includes.extend(includes);
            run_import(&file, &config, json.as_deref())?;
        }
        Commands::Info { file } => {
            show_info(&file)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ImportConfig> {
    match path {
        Some(path) => ImportConfig::load(path)
            .with_context(|| format!("reading config {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            ImportConfig::load(DEFAULT_CONFIG).with_context(|| format!("reading {DEFAULT_CONFIG}"))
        }
        None => Ok(ImportConfig::default()),
    }
}

fn run_import(file: &Path, config: &ImportConfig, json: Option<&Path>) -> Result<()> {
    let shapes = import_file(file, config).with_context(|| format!("importing {}", file.display()))?;

    for shape in &shapes.shapes {
        let triangles: usize = shape.faces.iter().map(|f| f.triangles().count()).sum();
        println!(
            "{}: {} points, {} frames, {} faces ({} triangles)",
            shape.header.unique_name,
            shape.points.len(),
            shape.frames.len(),
            shape.faces.len(),
            triangles
        );
    }
    for blank in &shapes.blanks {
        println!("{}: unresolved blank", blank.header.unique_name);
    }

    if let Some(out) = json {
        let text = serde_json::to_string_pretty(&shapes)?;
        std::fs::write(out, text).with_context(|| format!("writing {}", out.display()))?;
        println!("Wrote {}", out.display());
    }

    report_errors(&shapes);
    Ok(())
}

fn report_errors(shapes: &ShapeFile) {
    if shapes.has_errors() {
        eprint!("{}", shapes.error_log);
    }
    let missing = shapes.missing_declarations();
    if !missing.is_empty() {
        eprintln!("declared but not built: {}", missing.join(", "));
    }
}

fn show_info(file: &Path) -> Result<()> {
    let config = load_config(None)?;
    let classified = classify_file(file, FileId(0), config.encoding)
        .with_context(|| format!("classifying {}", file.display()))?;

    let count = |kind| classified.chunks.iter().filter(|c| c.kind() == kind).count();
    println!("shape source: {}", file.display());
    println!("  Encoding: {}", classified.encoding);
    println!("  Comments: {}", count(ChunkKind::Comment));
    println!("  Macro definition lines: {}", count(ChunkKind::MacroDefinition));
    println!("  Code lines: {}", count(ChunkKind::Line));

    let shapes = import_file(file, &config)?;
    println!("  Shapes: {}", shapes.shapes.len());
    println!("  Unresolved blanks: {}", shapes.blanks.len());
    println!("  Declared names: {}", shapes.declared_names.len());
    Ok(())
}
