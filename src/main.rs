//! Command-line interface for nfe-xsd

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::fs;
#[cfg(feature = "cli")]
use std::path::PathBuf;
#[cfg(feature = "cli")]
use std::process::ExitCode;

#[cfg(feature = "cli")]
use nfe_xsd::comparison::{compare_documents, outline};
#[cfg(feature = "cli")]
use nfe_xsd::documents::parse_named_document;
#[cfg(feature = "cli")]
use nfe_xsd::{Limits, SchemaBundle};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "nfe-xsd")]
#[command(
    author,
    version,
    about = "NF-e XML comparison and XSD validation tool",
    long_about = None
)]
struct Cli {
    /// Log schema loading and validation details (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare a candidate document against an accepted reference
    Diff {
        /// Reference XML, e.g. an invoice the tax authority accepted
        #[arg(value_name = "REFERENCE")]
        reference: PathBuf,

        /// Candidate XML
        #[arg(value_name = "CANDIDATE")]
        candidate: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Validate an XML document against an XSD schema set
    Validate {
        /// Path to the primary XSD schema file
        #[arg(short, long, value_name = "SCHEMA")]
        schema: PathBuf,

        /// Directory of included and imported schemas (defaults to the primary's)
        #[arg(long, value_name = "DIR")]
        schema_dir: Option<PathBuf>,

        /// Path to the XML file to validate
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// List the elements of a document in order
    Outline {
        /// Path to the XML file
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Diff {
            reference,
            candidate,
            json,
        } => cmd_diff(reference, candidate, json),
        Commands::Validate {
            schema,
            schema_dir,
            file,
            json,
        } => cmd_validate(schema, schema_dir, file, json),
        Commands::Outline { file } => cmd_outline(file),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether the documents are identical
#[cfg(feature = "cli")]
fn cmd_diff(
    reference: PathBuf,
    candidate: PathBuf,
    json_output: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let reference_xml = fs::read_to_string(&reference)?;
    let candidate_xml = fs::read_to_string(&candidate)?;

    let result = compare_documents(&reference_xml, &candidate_xml, &Limits::default())?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(result.is_identical());
    }

    if result.is_identical() {
        println!("✓ Documents are structurally identical ({} keys)", result.unchanged);
        return Ok(true);
    }

    println!(
        "✗ {} difference(s), {} key(s) unchanged",
        result.difference_count(),
        result.unchanged
    );
    if !result.missing.is_empty() {
        println!();
        println!("Missing from candidate:");
        for (key, value) in &result.missing {
            println!("  - {} = {}", key, value);
        }
    }
    if !result.extra.is_empty() {
        println!();
        println!("Extra in candidate:");
        for (key, value) in &result.extra {
            println!("  + {} = {}", key, value);
        }
    }
    if !result.changed.is_empty() {
        println!();
        println!("Changed:");
        for change in &result.changed {
            println!("  ~ {}: {} -> {}", change.key, change.reference, change.candidate);
        }
    }

    Ok(false)
}

/// Returns whether the document is valid
#[cfg(feature = "cli")]
fn cmd_validate(
    schema: PathBuf,
    schema_dir: Option<PathBuf>,
    file: PathBuf,
    json_output: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let bundle = SchemaBundle::from_file(&schema, schema_dir.as_deref(), Limits::default())?;
    let xml = fs::read_to_string(&file)?;
    let report = bundle.validate_str(&xml)?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(report.valid);
    }

    if report.valid {
        println!("✓ Document is valid");
    } else {
        println!("✗ Document is invalid");
        println!();
        println!("Errors:");
        for error in &report.errors {
            println!("  - {} ({})", error, error.path);
        }
    }

    Ok(report.valid)
}

#[cfg(feature = "cli")]
fn cmd_outline(file: PathBuf) -> Result<bool, Box<dyn std::error::Error>> {
    let xml = fs::read_to_string(&file)?;
    let name = file.display().to_string();
    let doc = parse_named_document(&name, &xml, &Limits::default())?;

    for entry in outline(&doc) {
        println!("{}", entry);
    }

    Ok(true)
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
