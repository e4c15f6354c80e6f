//! OBDA CLI
//!
//! - `check`: load schema, ontology and mappings and report undeclared signatures
//! - `optimize`: run the mapping passes and optionally write the optimized set
//! - `translate`: translate a SPARQL query to SQL against the optimized set

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use obda_model::Mapping;
use obda_optimize::{undeclared_signatures, OptimizerPipeline, ProcessorKind, ProcessorReport};
use obda_translate::{EngineContext, QueryTranslator, TranslationResult};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod load;

use load::Inputs;

#[derive(Parser)]
#[command(name = "obda")]
#[command(author, version, about = "Ontology-based data access: mapping optimization and SPARQL-to-SQL translation")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load all inputs and check mapping signatures against the ontology.
    Check {
        #[command(flatten)]
        inputs: Inputs,
    },

    /// Run the mapping passes (t-mapping, referential-integrity, disjunction).
    Optimize {
        #[command(flatten)]
        inputs: Inputs,
        /// Passes to run, in order (defaults to the configured list)
        #[arg(short, long, value_delimiter = ',')]
        processors: Vec<ProcessorKind>,
        /// Write the optimized mappings as JSON
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the pass reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Translate a SPARQL SELECT query to SQL.
    Translate {
        #[command(flatten)]
        inputs: Inputs,
        /// Query text; read from `--query-file` or stdin when absent
        #[arg(short, long)]
        query: Option<String>,
        /// File holding the query text
        #[arg(long, conflicts_with = "query")]
        query_file: Option<PathBuf>,
        /// Print SQL and column metadata as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Check { inputs } => cmd_check(&inputs),
        Commands::Optimize {
            inputs,
            processors,
            out,
            json,
        } => cmd_optimize(&inputs, &processors, out.as_deref(), json),
        Commands::Translate {
            inputs,
            query,
            query_file,
            json,
        } => {
            let text = match (query, query_file) {
                (Some(text), _) => text,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read query {}", path.display()))?,
                (None, None) => {
                    let mut text = String::new();
                    io::stdin()
                        .read_to_string(&mut text)
                        .context("failed to read the query from stdin")?;
                    text
                }
            };
            cmd_translate(&inputs, &text, json)
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

fn cmd_check(inputs: &Inputs) -> Result<()> {
    let loaded = inputs.load()?;
    let kb = &loaded.kb;
    eprintln!(
        "{} {} mapping(s) over {} signature(s), {} table(s)",
        "loaded".green().bold(),
        kb.mappings().len(),
        kb.mappings().signatures().count(),
        kb.metadata().tables().count()
    );

    let undeclared = undeclared_signatures(kb.mappings(), kb.hierarchy());
    if undeclared.is_empty() {
        eprintln!("{} every signature is declared", "ok".green().bold());
        return Ok(());
    }
    let label = if loaded.config.strict_mode {
        "error:".red().bold()
    } else {
        "warning:".yellow().bold()
    };
    for entry in &undeclared {
        eprintln!("{label} {entry}");
    }
    if loaded.config.strict_mode {
        return Err(anyhow!(
            "{} undeclared signature(s) in strict mode",
            undeclared.len()
        ));
    }
    Ok(())
}

fn print_reports(reports: &[ProcessorReport], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(reports)?);
        return Ok(());
    }
    for report in reports {
        eprintln!("{} {report}", "pass".cyan().bold());
        for (reason, count) in &report.skipped {
            eprintln!("    skipped {count} × {reason}");
        }
    }
    Ok(())
}

fn cmd_optimize(
    inputs: &Inputs,
    processors: &[ProcessorKind],
    out: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut loaded = inputs.load()?;
    let kinds = if processors.is_empty() {
        loaded.config.processors.clone()
    } else {
        processors.to_vec()
    };
    obda_optimize::validate_signatures(
        loaded.kb.mappings(),
        loaded.kb.hierarchy(),
        loaded.config.strict_mode,
    )?;
    let reports = OptimizerPipeline::from_kinds(&kinds).run(&mut loaded.kb)?;
    print_reports(&reports, json)?;

    if let Some(out) = out {
        let mappings: Vec<&Mapping> = loaded.kb.mappings().iter().collect();
        let text = serde_json::to_string_pretty(&mappings)?;
        std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))?;
        eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    }
    Ok(())
}

fn print_translation(result: &TranslationResult) {
    println!("{};", result.sql);
    eprintln!("{}", "columns".bold());
    for column in &result.columns {
        let kind = if column.is_literal { "literal" } else { "iri" };
        match &column.datatype {
            Some(datatype) => eprintln!("  {} {kind} <{datatype}>", column.label),
            None => eprintln!("  {} {kind}", column.label),
        }
    }
}

fn cmd_translate(inputs: &Inputs, query: &str, json: bool) -> Result<()> {
    let mut loaded = inputs.load()?;
    let (context, reports) = EngineContext::prepare(loaded.config, &mut loaded.kb)?;
    for report in &reports {
        tracing::info!(%report, "mapping pass");
    }
    let translator = QueryTranslator::new(Arc::new(context));
    let result = translator.translate(query)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_translation(&result);
    }
    Ok(())
}
