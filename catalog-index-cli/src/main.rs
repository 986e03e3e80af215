use catalog_index::{
    ConnectionCache, IndexDefinition, IndexError, IndexWorker, Outcome, QueryPlan, StaticEntity,
    VariantMode, WorkerConfig,
};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "catalog-index", version, about = "Maintain and query catalog search indices")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Index definition (JSON)
    #[arg(long, global = true, env = "CATALOG_INDEX_DEFINITION")]
    definition: Option<PathBuf>,

    /// Worker configuration (JSON)
    #[arg(long, global = true, env = "CATALOG_INDEX_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Drop and recreate every store of the index with fresh mappings
    SyncSchema,
    /// Delete every store of the index
    Drop,
    /// Move the index's stores to a new index name
    Rename {
        #[arg(long)]
        to: String,
    },
    /// Index the entities of a JSON array file
    Index {
        #[arg(long)]
        entities: PathBuf,
    },
    /// Remove an entity and its relation rows
    Delete {
        #[arg(long)]
        id: i64,
    },
    /// List matching entity ids
    Search {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        locale: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        offset: Option<usize>,
        /// Keep only hits within 90% of the best score
        #[arg(long)]
        relevance: bool,
        /// Return parent ids instead of entity ids
        #[arg(long)]
        parents: bool,
    },
    /// Count matching entities
    Count {
        #[arg(long)]
        filter: Option<String>,
        #[arg(long)]
        locale: Option<String>,
        #[arg(long)]
        parents: bool,
    },
    /// Suggest corrections for a search term
    Suggest {
        #[arg(long)]
        term: String,
        #[arg(long = "field", required = true)]
        fields: Vec<String>,
        #[arg(long, default_value = "5")]
        max: usize,
        #[arg(long)]
        locale: Option<String>,
    },
}

fn read_definition(path: Option<&Path>) -> Result<IndexDefinition, IndexError> {
    let path = path.ok_or_else(|| {
        IndexError::Config("No index definition given (--definition)".to_string())
    })?;
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn read_entities(path: &Path) -> Result<Vec<StaticEntity>, IndexError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn build_plan(
    filter: Option<&str>,
    locale: Option<&str>,
    parents: bool,
) -> Result<QueryPlan, IndexError> {
    let mut plan = match filter {
        Some(expression) => QueryPlan::new().where_clause(expression)?,
        None => QueryPlan::new(),
    };
    if let Some(locale) = locale {
        plan = plan.locale(locale);
    }
    if parents {
        plan = plan.variant_mode(VariantMode::Parents);
    }
    Ok(plan)
}

fn outcome_json(outcome: &Outcome) -> Value {
    json!({
        "clean": outcome.is_clean(),
        "failures": outcome
            .failures()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    })
}

async fn run(cli: Cli) -> Result<Value, IndexError> {
    let config = WorkerConfig::load_or_default(cli.config.as_deref());
    let definition = read_definition(cli.definition.as_deref())?;
    let cache = Arc::new(ConnectionCache::http(config.request_timeout()));
    let worker = IndexWorker::new(cache, config);

    // fail before any subcommand work when the definition has no hosts
    worker.backend(&definition)?;

    match cli.command {
        Command::SyncSchema => {
            let outcome = worker.create_or_update_index_structures(&definition).await?;
            Ok(outcome_json(&outcome))
        }
        Command::Drop => {
            let outcome = worker.delete_index_structures(&definition).await?;
            Ok(outcome_json(&outcome))
        }
        Command::Rename { to } => {
            let outcome = worker
                .rename_index_structures(&definition, &definition.name, &to)
                .await?;
            Ok(outcome_json(&outcome))
        }
        Command::Index { entities } => {
            let entities = read_entities(&entities)?;
            let mut outcome = Outcome::new();
            for entity in &entities {
                outcome.merge(worker.update_index(&definition, entity).await?);
            }
            tracing::info!(index = %definition.name, entities = entities.len(), "Indexed entities");
            let mut out = outcome_json(&outcome);
            out["indexed"] = json!(entities.len());
            Ok(out)
        }
        Command::Delete { id } => {
            let entity = StaticEntity::new(id);
            let mut outcome = worker.delete_from_index(&definition, &entity).await?;
            outcome.merge(
                worker
                    .delete_from_relational_index(&definition, &entity)
                    .await?,
            );
            Ok(outcome_json(&outcome))
        }
        Command::Search {
            filter,
            locale,
            limit,
            offset,
            relevance,
            parents,
        } => {
            let mut plan = build_plan(filter.as_deref(), locale.as_deref(), parents)?
                .sort_by_score(relevance);
            if let Some(limit) = limit {
                plan = plan.limit(limit);
            }
            if let Some(offset) = offset {
                plan = plan.offset(offset);
            }
            let mut listing = worker.listing(&definition, plan)?;
            let ids = listing.load().await?;
            Ok(json!({ "ids": ids, "total": listing.last_record_count() }))
        }
        Command::Count {
            filter,
            locale,
            parents,
        } => {
            let plan = build_plan(filter.as_deref(), locale.as_deref(), parents)?;
            let count = worker.listing(&definition, plan)?.count().await?;
            Ok(json!({ "count": count }))
        }
        Command::Suggest {
            term,
            fields,
            max,
            locale,
        } => {
            let plan = build_plan(None, locale.as_deref(), false)?;
            let suggestions = worker
                .listing(&definition, plan)?
                .suggest(&term, &fields, max)
                .await?;
            Ok(json!({ "suggestions": suggestions }))
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match run(cli).await {
        Ok(output) => println!("{}", output),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
