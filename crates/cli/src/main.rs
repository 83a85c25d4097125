//! residency-forms: stamp residency PDF templates from the command line
//!
//! ```text
//! residency-forms generate --term intersession --record form.json \
//!     --templates public --out out --signature signature.png
//! residency-forms fees --term regular --record form.json
//! residency-forms registry list
//! ```

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use forms::{
    format::format_amount, ApplicantForm, ApplicantRecord, DirectorySource, Orchestrator,
    Registry, Signature,
};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "residency-forms", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamp every document of a term and write the PDFs
    Generate(GenerateArgs),
    /// Print the appliance fee breakdown for a form
    Fees(FeesArgs),
    /// Inspect term registries
    #[command(subcommand)]
    Registry(RegistryCommand),
}

#[derive(Args, Debug)]
struct TermArgs {
    /// Term id
    #[arg(short, long, default_value = "intersession")]
    term: String,

    /// Extra registry JSON loaded on top of the bundled terms
    #[arg(long)]
    registry: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GenerateArgs {
    #[command(flatten)]
    term: TermArgs,

    /// Applicant form JSON (camelCase keys)
    #[arg(short, long)]
    record: PathBuf,

    /// Directory template references are resolved against
    #[arg(long, default_value = "public")]
    templates: PathBuf,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    out: PathBuf,

    /// Signature image (PNG or JPEG)
    #[arg(short, long)]
    signature: Option<PathBuf>,

    /// Submission date (YYYY-MM-DD) when the form has none; defaults to today
    #[arg(short, long)]
    date: Option<NaiveDate>,

    /// Skip required-field validation (sample output)
    #[arg(long)]
    preview: bool,

    /// Only generate this document code
    #[arg(long)]
    only: Option<String>,
}

#[derive(Args, Debug)]
struct FeesArgs {
    #[command(flatten)]
    term: TermArgs,

    /// Applicant form JSON (camelCase keys)
    #[arg(short, long)]
    record: PathBuf,
}

#[derive(Subcommand, Debug)]
enum RegistryCommand {
    /// List terms and their documents
    List {
        /// Extra registry JSON loaded on top of the bundled terms
        #[arg(long)]
        registry: Option<PathBuf>,
    },
    /// Check a registry JSON file
    Validate {
        /// Registry JSON file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Generate(args) => generate(args),
        Command::Fees(args) => fees(args),
        Command::Registry(RegistryCommand::List { registry }) => list(registry.as_deref()),
        Command::Registry(RegistryCommand::Validate { path }) => validate(&path),
    }
}

fn load_registry(extra: Option<&Path>) -> Result<Registry> {
    let mut registry = Registry::bundled().context("bundled registry is invalid")?;
    if let Some(path) = extra {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read registry {}", path.display()))?;
        registry
            .load_json_str(&json)
            .with_context(|| format!("Invalid registry {}", path.display()))?;
    }
    Ok(registry)
}

fn load_form(path: &Path) -> Result<ApplicantForm> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read form {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid form JSON {}", path.display()))
}

/// Finalize the form, filling the submission date and signature from the flags
fn prepare_record(mut form: ApplicantForm, args: &GenerateArgs) -> Result<ApplicantRecord> {
    if form.submission_date.trim().is_empty() {
        let date = args.date.unwrap_or_else(|| Local::now().date_naive());
        form.submission_date = date.format("%Y-%m-%d").to_string();
    }

    let mut record = if args.preview {
        form.finalize()?
    } else {
        form.submit()?
    };

    if let Some(path) = &args.signature {
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read signature {}", path.display()))?;
        record.signature = Some(Signature::from_bytes(bytes)?);
    }

    Ok(record)
}

fn generate(args: GenerateArgs) -> Result<()> {
    let registry = load_registry(args.term.registry.as_deref())?;
    let term = registry.term(&args.term.term)?;
    let record = prepare_record(load_form(&args.record)?, &args)?;

    let source = DirectorySource::new(&args.templates);
    let orchestrator = Orchestrator::new(term, &source);
    let documents = match &args.only {
        Some(code) => vec![orchestrator.generate_one(code, &record)?],
        None => orchestrator.generate_all(&record),
    };

    fs::create_dir_all(&args.out)
        .with_context(|| format!("Failed to create {}", args.out.display()))?;

    let mut failed = Vec::new();
    for document in documents {
        match document.result {
            Ok(bytes) => {
                let path = args.out.join(&document.filename);
                fs::write(&path, bytes)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                info!("wrote {}", path.display());
            }
            Err(e) => {
                warn!("{} not written: {e}", document.filename);
                failed.push(document.code);
            }
        }
    }

    if !failed.is_empty() {
        bail!("{} document(s) failed: {}", failed.len(), failed.join(", "));
    }
    Ok(())
}

fn fees(args: FeesArgs) -> Result<()> {
    let registry = load_registry(args.term.registry.as_deref())?;
    let term = registry.term(&args.term.term)?;
    let form = load_form(&args.record)?;

    for key in &form.appliances {
        if term.fees.contains(key) {
            println!("{key:<20} {:>10}", format_amount(term.fees.fee(key)));
        } else {
            println!("{key:<20} {:>10}", "-");
        }
    }
    let other = forms::fees::parse_override(&form.other_appliances_cost);
    if other > 0 {
        println!("{:<20} {:>10}", "other", format_amount(other));
    }

    let total = term
        .fees
        .total_fee(&form.appliances, Some(form.other_appliances_cost.as_str()));
    println!("{:<20} {:>10}", "total", format_amount(total));
    Ok(())
}

fn list(extra: Option<&Path>) -> Result<()> {
    let registry = load_registry(extra)?;
    for term in registry.terms() {
        println!("{} ({})", term.term, term.label);
        for document in &term.documents {
            println!(
                "  {:<4} {:<28} {} placements",
                document.code,
                document.title,
                document.placements.len()
            );
        }
    }
    Ok(())
}

fn validate(path: &Path) -> Result<()> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read registry {}", path.display()))?;
    let registry = Registry::from_json_str(&json)?;
    for term in registry.terms() {
        println!("{}: ok ({} documents)", term.term, term.documents.len());
    }
    Ok(())
}
