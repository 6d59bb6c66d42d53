//! semlens CLI: annotation-graph interpretation and cross-model alignment.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, WrapErr};
use oxigraph::io::RdfFormat;

use semlens::align::{DEFAULT_ALIGN_THRESHOLD, align};
use semlens::extract::{extract_model, extract_model_fuzzy};
use semlens::graph::ModelGraph;
use semlens::graph::turtle;
use semlens::lookup::{BioPortalClient, link_labels};
use semlens::oracle::TokenBundleOracle;
use semlens::record::ModelRecord;
use semlens::roles::{DEFAULT_THRESHOLD, RoleMatcher};

#[derive(Parser)]
#[command(
    name = "semlens",
    version,
    about = "Interpret biosimulation annotation graphs and align models"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    /// Turtle (.ttl).
    Turtle,
    /// RDF/XML, as emitted by older annotation tools.
    Xml,
}

impl From<Format> for RdfFormat {
    fn from(format: Format) -> RdfFormat {
        match format {
            Format::Turtle => RdfFormat::Turtle,
            Format::Xml => RdfFormat::RdfXml,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Interpret an annotation graph into a JSON model record.
    Interpret {
        /// Path to the RDF annotation file.
        file: PathBuf,

        /// Use the fuzzy subgraph-guessing pipeline.
        #[arg(long)]
        fuzzy: bool,

        /// Input serialization.
        #[arg(long, value_enum, default_value = "turtle")]
        format: Format,

        /// Base IRI for resolving relative identifiers (default: the file's
        /// own file:// URL).
        #[arg(long)]
        base_iri: Option<String>,

        /// Override the derived model base IRI in the output record.
        #[arg(long)]
        model_base: Option<String>,

        /// Predicate-role similarity threshold.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,

        /// Output file (default: stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Align a composed model record against its module records.
    Align {
        /// Composed model record (JSON).
        composed: PathBuf,

        /// Module model records (JSON), one per module.
        #[arg(required = true)]
        modules: Vec<PathBuf>,

        /// Alignment similarity threshold.
        #[arg(long, default_value_t = DEFAULT_ALIGN_THRESHOLD)]
        threshold: f32,

        /// Output file (default: `<composed>_linked.json`).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Decorate a model record with ontology labels.
    Link {
        /// Model record (JSON).
        record: PathBuf,

        /// BioPortal API key.
        #[arg(long)]
        api_key: String,

        /// Output file (default: stdout).
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

fn read_record(path: &Path) -> Result<ModelRecord> {
    let data = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data)
        .into_diagnostic()
        .wrap_err_with(|| format!("{} is not a model record", path.display()))
}

fn write_record(record: &ModelRecord, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(record).into_diagnostic()?;
    match output {
        Some(path) => fs::write(path, json)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Interpret {
            file,
            fuzzy,
            format,
            base_iri,
            model_base,
            threshold,
            output,
        } => {
            let graph = ModelGraph::new();
            turtle::load_file(&graph, &file, format.into(), base_iri.as_deref())?;

            let matcher = RoleMatcher::new(Arc::new(TokenBundleOracle::default()))
                .with_threshold(threshold);
            let mut record = if fuzzy {
                extract_model_fuzzy(&graph, &matcher)?
            } else {
                extract_model(&graph, &matcher)?
            };
            if model_base.is_some() {
                record.model_base = model_base;
            }
            write_record(&record, output.as_deref())
        }

        Commands::Align {
            composed,
            modules,
            threshold,
            output,
        } => {
            let mut record = read_record(&composed)?;
            let module_records = modules
                .iter()
                .map(|path| read_record(path))
                .collect::<Result<Vec<_>>>()?;

            let oracle = TokenBundleOracle::default();
            let report = align(&mut record, &module_records, &oracle, threshold);
            for err in &report.missing {
                eprintln!("warning: {err}");
            }
            eprintln!(
                "anchored {} of {} processes",
                report.anchored.len(),
                report.anchored.len() + report.missing.len()
            );

            let output = output.unwrap_or_else(|| {
                let stem = composed
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "composed".into());
                composed.with_file_name(format!("{stem}_linked.json"))
            });
            write_record(&record, Some(&output))
        }

        Commands::Link {
            record,
            api_key,
            output,
        } => {
            let mut model = read_record(&record)?;
            let client = BioPortalClient::new(&api_key);
            link_labels(&mut model, &client);
            write_record(&model, output.as_deref())
        }
    }
}
