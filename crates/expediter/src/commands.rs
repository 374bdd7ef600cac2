//! Subcommand implementations.
//!
//! Every command is one stateless activation against the shared
//! database: open the store, do one thing, print, exit. Dispatch
//! messages produced by a command are drained from the in-process
//! queues and printed as JSON lines so an operator (or a wrapper
//! script) can forward them to the actual workers.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use tracing::info;

use expediter_core::{
    BatchId, InvocationId, OrchestrationId, RegistrationRecord, ToolDescriptor,
};
use expediter_planner::{HttpPlanner, InferenceParams};
use expediter_runtime::{
    CompletionDetail, CompletionEvent, CompletionOutcome, InProcessTransport, Orchestrator,
    OrchestratorConfig,
};
use expediter_store::{ConnectionConfig, Store};

use crate::settings::Settings;

/// Open the shared store per settings, creating the parent directory.
pub fn open_store(settings: &Settings) -> Result<Store> {
    if let Some(parent) = settings.database.path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let config = ConnectionConfig {
        pool_size: settings.database.pool_size,
        busy_timeout_ms: settings.database.busy_timeout_ms,
    };
    let path = settings.database.path.to_string_lossy();
    Store::open(&path, &config).context("failed to open database")
}

fn build_engine(settings: &Settings, store: &Store) -> (Orchestrator, Arc<InProcessTransport>) {
    let planner = Arc::new(HttpPlanner::new(
        settings.planner.endpoint.clone(),
        settings.planner.model_id.clone(),
    ));
    let transport = Arc::new(InProcessTransport::new());
    let orchestrator = Orchestrator::new(
        store.clone(),
        planner,
        transport.clone(),
        OrchestratorConfig {
            system_prompt: settings.system_prompt.clone(),
            params: InferenceParams {
                max_tokens: settings.planner.max_tokens,
                temperature: settings.planner.temperature,
            },
        },
    );
    (orchestrator, transport)
}

/// Print every dispatch message queued during this activation.
fn print_dispatches(store: &Store, transport: &InProcessTransport) -> Result<()> {
    for tool in store.list_tools()? {
        for message in transport.drain(&tool.target) {
            println!("{}", serde_json::to_string(&json!({
                "target": tool.target,
                "message": message,
            }))?);
        }
    }
    Ok(())
}

/// `submit` — start a new orchestration from free text.
pub async fn submit(settings: &Settings, text: &str) -> Result<()> {
    let store = open_store(settings)?;
    let (orchestrator, transport) = build_engine(settings, &store);

    let id = orchestrator.begin(text).await?;
    println!("orchestration {id}");
    print_dispatches(&store, &transport)?;
    Ok(())
}

/// Arguments for the `complete` command.
pub struct CompleteArgs {
    /// Full completion event as raw JSON; overrides the field args.
    pub event_json: Option<String>,
    /// Orchestration id the completion belongs to.
    pub orchestration_id: Option<String>,
    /// Batch id the task was dispatched under.
    pub batch_id: Option<String>,
    /// Invocation id echoed from the dispatch message.
    pub tool_use_id: Option<String>,
    /// Task (tool) name.
    pub node: Option<String>,
    /// Result payload as raw JSON; defaults to null.
    pub data: Option<String>,
}

impl CompleteArgs {
    fn into_event(self) -> Result<CompletionEvent> {
        if let Some(raw) = self.event_json {
            return serde_json::from_str(&raw).context("invalid completion event JSON");
        }
        let (Some(orchestration_id), Some(batch_id), Some(tool_use_id), Some(node)) = (
            self.orchestration_id,
            self.batch_id,
            self.tool_use_id,
            self.node,
        ) else {
            bail!("either --event or all of --orchestration-id, --batch-id, --tool-use-id, --node are required");
        };
        let data = match self.data {
            Some(raw) => serde_json::from_str(&raw).context("invalid --data JSON")?,
            None => Value::Null,
        };
        Ok(CompletionEvent::new(CompletionDetail {
            orchestration_id: OrchestrationId::from_string(orchestration_id),
            batch_id: BatchId::from_string(batch_id),
            tool_use_id: InvocationId::from_string(tool_use_id),
            node,
            data,
        }))
    }
}

/// `complete` — inject one task completion event.
pub async fn complete(settings: &Settings, args: CompleteArgs) -> Result<()> {
    let store = open_store(settings)?;
    let (orchestrator, transport) = build_engine(settings, &store);

    let event = args.into_event()?;
    let outcome = orchestrator.handle_completion(&event).await?;
    match outcome {
        CompletionOutcome::Advanced(status) => {
            println!("batch complete, orchestration now {}", status.as_str());
            print_dispatches(&store, &transport)?;
        }
        CompletionOutcome::StillPending { remaining } => {
            println!("recorded, {remaining} task(s) still pending");
        }
        CompletionOutcome::Duplicate => println!("duplicate, already recorded"),
        CompletionOutcome::Dropped => println!("dropped, event did not match live state"),
    }
    Ok(())
}

fn read_record(file: Option<&PathBuf>) -> Result<RegistrationRecord> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            let _ = std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read registration record from stdin")?;
            buffer
        }
    };
    serde_json::from_str(&raw).context("invalid registration record JSON")
}

/// `register-tool` — validate and upsert one registration record.
pub fn register_tool(settings: &Settings, file: Option<&PathBuf>) -> Result<()> {
    let store = open_store(settings)?;
    let record = read_record(file)?;
    let descriptor = ToolDescriptor::from_registration(&record)?;
    store.upsert_tool(&descriptor)?;
    println!("registered {} -> {}", descriptor.name, descriptor.target);
    Ok(())
}

/// `seed-tools` — register the demo fast-food worker set.
pub fn seed_tools(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    for record in demo_records()? {
        let descriptor = ToolDescriptor::from_registration(&record)?;
        store.upsert_tool(&descriptor)?;
        info!(tool = %descriptor.name, "seeded");
        println!("registered {} -> {}", descriptor.name, descriptor.target);
    }
    Ok(())
}

/// `list-tools` — print the registry.
pub fn list_tools(settings: &Settings) -> Result<()> {
    let store = open_store(settings)?;
    let tools = store.list_tools()?;
    if tools.is_empty() {
        println!("no tools registered");
        return Ok(());
    }
    for tool in tools {
        println!("{}\t{}\t{}", tool.name, tool.target, tool.description);
    }
    Ok(())
}

/// `show` — dump one orchestration's durable state as JSON.
pub fn show(settings: &Settings, id: &str) -> Result<()> {
    let store = open_store(settings)?;
    let Some(record) = store.load_orchestration(&OrchestrationId::from(id))? else {
        bail!("no orchestration {id}");
    };

    let batch = record
        .outstanding_batch
        .as_ref()
        .map(|batch_id| -> Result<Value> {
            let rows = store.read_batch(batch_id)?;
            Ok(json!({
                "batchId": batch_id,
                "tasks": rows
                    .iter()
                    .map(|row| json!({
                        "task": row.task,
                        "toolUseId": row.invocation_id,
                        "done": row.done,
                        "payload": row.payload,
                    }))
                    .collect::<Vec<_>>(),
            }))
        })
        .transpose()?;

    let view = json!({
        "orchestrationId": record.id,
        "instance": record.instance,
        "status": record.status.as_str(),
        "outstandingBatch": batch,
        "conversation": record.conversation,
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn demo_records() -> Result<Vec<RegistrationRecord>> {
    let records = json!([
        {
            "toolId": "cook_burger",
            "config": {
                "name": "cook_burger",
                "description": "Cooks the burger that has been requested.",
                "schema": {
                    "type": "object",
                    "properties": {
                        "burgerOrder": {
                            "type": "string",
                            "description": "A description of the burger that needs to be cooked"
                        }
                    },
                    "required": ["burgerOrder"]
                },
                "action": {"type": "queue", "target": "queue://burger-cook"}
            }
        },
        {
            "toolId": "fry_fries",
            "config": {
                "name": "fry_fries",
                "description": "Fries the fries that have been requested.",
                "schema": {
                    "type": "object",
                    "properties": {
                        "mealDetails": {
                            "type": "string",
                            "description": "A description of the fries that need to be fried"
                        }
                    },
                    "required": ["mealDetails"]
                },
                "action": {"type": "queue", "target": "queue://fries-cook"}
            }
        },
        {
            "toolId": "front_counter",
            "config": {
                "name": "front_counter",
                "description": "Delivers the completed meal to the customer.",
                "schema": {
                    "type": "object",
                    "properties": {
                        "taskDetails": {
                            "type": "string",
                            "description": "A description of the meal that is ready for handover"
                        }
                    },
                    "required": ["taskDetails"]
                },
                "action": {"type": "queue", "target": "queue://front-counter"}
            }
        }
    ]);
    Ok(serde_json::from_value(records)?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
