//! Factograph CLI: inspect the schema and run mutation scripts against an
//! in-memory graph

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use comfy_table::{ContentArrangement, Table};
use factograph::schema::FieldKind;
use factograph::{
    EngineConfig, EntityInput, EntityType, MemoryRepository, MutationResult, MutationService,
    Principal, SchemaRegistry,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "factograph", version, about = "Factograph manufacturing graph CLI")]
struct Cli {
    /// Engine configuration (YAML)
    #[arg(long, global = true, env = "FACTOGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Principal the script runs as
    #[arg(long, default_value = "cli", global = true)]
    subject: String,

    /// Roles of the principal (repeatable)
    #[arg(long = "role", global = true)]
    roles: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the declared schema
    Schema {
        /// Only this entity type
        #[arg(long = "type")]
        entity_type: Option<EntityType>,
    },
    /// Execute a JSON script of operations
    Run {
        /// Path to the script: a JSON array of steps
        script: PathBuf,
    },
}

/// One scripted operation. String values of the form `$name` are replaced by
/// the id produced by the earlier step carrying that `name`.
#[derive(Debug, Deserialize)]
struct ScriptStep {
    #[serde(default)]
    name: Option<String>,
    #[serde(flatten)]
    op: Operation,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Operation {
    Create {
        #[serde(rename = "type")]
        entity_type: EntityType,
        input: Value,
    },
    Update {
        #[serde(rename = "type")]
        entity_type: EntityType,
        id: String,
        input: Value,
    },
    Upsert {
        #[serde(rename = "type")]
        entity_type: EntityType,
        input: Value,
    },
    Delete {
        #[serde(rename = "type")]
        entity_type: EntityType,
        id: String,
        #[serde(default)]
        cascade: bool,
    },
    BulkDelete {
        #[serde(rename = "type")]
        entity_type: EntityType,
        id: String,
    },
    AddRelation {
        #[serde(default)]
        source_type: Option<EntityType>,
        predicate: String,
        source: String,
        target: String,
    },
    RemoveRelation {
        #[serde(default)]
        source_type: Option<EntityType>,
        predicate: String,
        source: String,
        target: String,
    },
    Get {
        #[serde(rename = "type")]
        entity_type: EntityType,
        id: String,
    },
    List {
        #[serde(rename = "type")]
        entity_type: EntityType,
    },
}

impl Operation {
    fn label(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::Update { .. } => "update",
            Operation::Upsert { .. } => "upsert",
            Operation::Delete { .. } => "delete",
            Operation::BulkDelete { .. } => "bulk_delete",
            Operation::AddRelation { .. } => "add_relation",
            Operation::RemoveRelation { .. } => "remove_relation",
            Operation::Get { .. } => "get",
            Operation::List { .. } => "list",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let service = MutationService::new(MemoryRepository::new(), config)?;
    let mut principal = Principal::new(cli.subject.as_str());
    for role in &cli.roles {
        principal = principal.with_role(role.as_str());
    }

    match cli.command {
        Commands::Schema { entity_type } => {
            print_schema(service.registry(), entity_type, &cli.format)
        }
        Commands::Run { script } => run_script(&service, &principal, &script, &cli.format),
    }
}

fn print_schema(
    registry: &SchemaRegistry,
    only: Option<EntityType>,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let schemas: Vec<_> = registry
        .types()
        .filter(|schema| only.map_or(true, |t| schema.entity_type == t))
        .collect();

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&schemas)?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Type", "Field", "Kind", "Target", "Cardinality", "Edges"]);

    for schema in &schemas {
        for field in schema.fields.values() {
            let row = match &field.kind {
                FieldKind::Scalar(def) => vec![
                    schema.entity_type.to_string(),
                    field.name.clone(),
                    if def.required {
                        format!("{} (required)", def.scalar_type)
                    } else {
                        def.scalar_type.to_string()
                    },
                    String::new(),
                    String::new(),
                    String::new(),
                ],
                FieldKind::Relation(def) => vec![
                    schema.entity_type.to_string(),
                    field.name.clone(),
                    "relation".to_string(),
                    def.target.to_string(),
                    format!("{:?}", def.cardinality),
                    def.ownership.to_string(),
                ],
            };
            table.add_row(row);
        }
    }

    println!("{}", table);
    println!("{} type(s)", schemas.len());
    Ok(())
}

fn run_script(
    service: &MutationService<MemoryRepository>,
    principal: &Principal,
    path: &Path,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    let steps: Vec<Value> = serde_json::from_str(&content).context("script must be a JSON array")?;

    let mut names: HashMap<String, String> = HashMap::new();
    let mut results = Vec::with_capacity(steps.len());

    for (index, raw) in steps.into_iter().enumerate() {
        let step: ScriptStep = serde_json::from_value(substitute(raw, &names)?)
            .with_context(|| format!("step {}", index + 1))?;
        let label = step.op.label();
        let result = execute(service, principal, step.op)
            .with_context(|| format!("step {} ({})", index + 1, label))?;

        if let (Some(name), Some(id)) = (&step.name, result.id()) {
            names.insert(name.clone(), id.to_string());
        }
        info!("Step {} {} -> {}", index + 1, label, result.code);
        results.push((label, result));
    }

    match format {
        OutputFormat::Json => {
            let envelopes: Vec<_> = results.iter().map(|(_, result)| result).collect();
            println!("{}", serde_json::to_string_pretty(&envelopes)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_content_arrangement(ContentArrangement::Dynamic);
            table.set_header(vec!["Step", "Op", "Code", "Message", "Id"]);
            for (index, (label, result)) in results.iter().enumerate() {
                table.add_row(vec![
                    (index + 1).to_string(),
                    label.to_string(),
                    result.code.to_string(),
                    result.message.clone(),
                    result.id().map(|id| id.to_string()).unwrap_or_default(),
                ]);
            }
            println!("{}", table);
            let failed = results.iter().filter(|(_, r)| !r.is_success()).count();
            println!("{} step(s), {} failed", results.len(), failed);
        }
    }

    Ok(())
}

fn execute(
    service: &MutationService<MemoryRepository>,
    principal: &Principal,
    op: Operation,
) -> anyhow::Result<MutationResult> {
    let result = match op {
        Operation::Create { entity_type, input } => {
            service.create(principal, entity_type, &EntityInput::try_from(input)?)?
        }
        Operation::Update { entity_type, id, input } => {
            service.update(principal, entity_type, &id, &EntityInput::try_from(input)?)?
        }
        Operation::Upsert { entity_type, input } => {
            service.upsert(principal, entity_type, &EntityInput::try_from(input)?)?
        }
        Operation::Delete { entity_type, id, cascade } => {
            service.delete(principal, entity_type, &id, cascade)?
        }
        Operation::BulkDelete { entity_type, id } => {
            service.bulk_delete(principal, entity_type, &id)?
        }
        Operation::AddRelation { source_type, predicate, source, target } => {
            service.add_relation(principal, source_type, &predicate, &source, &target)?
        }
        Operation::RemoveRelation { source_type, predicate, source, target } => {
            service.remove_relation(principal, source_type, &predicate, &source, &target)?
        }
        Operation::Get { entity_type, id } => service.get(principal, entity_type, &id)?,
        Operation::List { entity_type } => service.list(principal, entity_type)?,
    };
    Ok(result)
}

/// Replace `$name` strings with ids of earlier named steps
fn substitute(value: Value, names: &HashMap<String, String>) -> anyhow::Result<Value> {
    Ok(match value {
        Value::String(s) => match s.strip_prefix('$') {
            Some(name) => match names.get(name) {
                Some(id) => Value::String(id.clone()),
                None => bail!("unknown step name ${}", name),
            },
            None => Value::String(s),
        },
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|item| substitute(item, names))
                .collect::<anyhow::Result<_>>()?,
        ),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, item)| -> anyhow::Result<(String, Value)> {
                    Ok((key, substitute(item, names)?))
                })
                .collect::<anyhow::Result<_>>()?,
        ),
        other => other,
    })
}
