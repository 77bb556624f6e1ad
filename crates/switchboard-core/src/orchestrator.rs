//! The action state machine.
//!
//! `Orchestrator` joins the read-only `Catalog`, the `RecordStore` and a
//! `ProcessRunner`. A trigger moves an action `Idle | Completed | Error →
//! Running → Completed | Error`; the move into `Running` is a single atomic
//! check-and-set in the store, so two concurrent triggers of one action can
//! never both start. Different actions never block each other.
//!
//! The run itself executes on a spawned task. If the caller's future is
//! dropped (for example an HTTP client disconnects) the process still runs to
//! completion and the terminal record is still written.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::catalog::{ActionDefinition, Catalog};
use crate::command::CommandTemplate;
use crate::config::Config;
use crate::error::{Result, SwitchboardError};
use crate::record::{ActionRecord, ActionStatus, RecordPatch};
use crate::runner::ProcessRunner;
use crate::schema::ParameterSchema;
use crate::store::RecordStore;

pub const RECOVERED_RESULT: &str = "interrupted: process exited while action was running";

// ---------------------------------------------------------------------------
// MergedAction / TriggerOutcome
// ---------------------------------------------------------------------------

/// A catalog definition joined with its current record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedAction {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
    /// Whether a command is configured for this action.
    pub mapped: bool,
    pub enabled: bool,
    pub status: ActionStatus,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_result: Option<String>,
}

impl MergedAction {
    fn merge(definition: &ActionDefinition, record: ActionRecord, mapped: bool) -> Self {
        Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            parameters: definition.parameters.clone(),
            mapped,
            enabled: record.enabled,
            status: record.status,
            last_run_at: record.last_run_at,
            last_result: record.last_result,
        }
    }
}

/// The terminal state of a successful trigger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerOutcome {
    pub action_name: String,
    pub run_id: String,
    pub status: ActionStatus,
    pub last_run_at: DateTime<Utc>,
    pub last_result: String,
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Orchestrator {
    catalog: Arc<Catalog>,
    commands: Arc<HashMap<String, CommandTemplate>>,
    store: Arc<dyn RecordStore>,
    runner: Arc<dyn ProcessRunner>,
}

impl Orchestrator {
    pub fn new(
        catalog: Catalog,
        commands: HashMap<String, CommandTemplate>,
        store: Arc<dyn RecordStore>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            commands: Arc::new(commands),
            store,
            runner,
        }
    }

    /// Build an orchestrator from a loaded config, running commands with the
    /// configured `SystemRunner` rooted at `root`.
    pub fn from_config(config: &Config, root: &Path, store: Arc<dyn RecordStore>) -> Result<Self> {
        let catalog = config.catalog()?;
        let runner = Arc::new(config.runner.build_runner(root));
        Ok(Self::new(catalog, config.commands(), store, runner))
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Every cataloged action merged with its record, in catalog order.
    pub async fn list_actions(&self) -> Result<Vec<MergedAction>> {
        let stored = self.with_store(|store| store.list()).await?;
        let mut by_name: HashMap<String, ActionRecord> = stored
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();

        Ok(self
            .catalog
            .list_definitions()
            .iter()
            .map(|def| {
                let record = by_name
                    .remove(&def.name)
                    .unwrap_or_else(|| ActionRecord::new(&def.name));
                MergedAction::merge(def, record, self.commands.contains_key(&def.name))
            })
            .collect())
    }

    pub async fn get_status(&self, name: &str) -> Result<MergedAction> {
        let definition = self.definition(name)?;
        let key = name.to_string();
        let record = self.with_store(move |store| store.get(&key)).await?;
        Ok(MergedAction::merge(
            definition,
            record,
            self.commands.contains_key(name),
        ))
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Set the enabled flag. An in-flight run is not interrupted.
    pub async fn toggle_action(&self, name: &str, enable: bool) -> Result<MergedAction> {
        let definition = self.definition(name)?;
        let key = name.to_string();
        let record = self
            .with_store(move |store| store.upsert(&key, &RecordPatch::enabled(enable)))
            .await?;
        info!(action = %name, enabled = enable, "action toggled");
        Ok(MergedAction::merge(
            definition,
            record,
            self.commands.contains_key(name),
        ))
    }

    /// Validate, start, execute and record one run of `name`.
    ///
    /// Client errors (`ActionNotFound`, `ActionDisabled`, `AlreadyRunning`,
    /// `InvalidParameters`) leave the record untouched. Once the run has
    /// started, every outcome is written to the record before returning.
    pub async fn trigger_action(
        &self,
        name: &str,
        parameters: Map<String, Value>,
    ) -> Result<TriggerOutcome> {
        let definition = self.definition(name)?;

        let key = name.to_string();
        let current = self.with_store(move |store| store.get(&key)).await?;
        ensure_runnable(&current)?;

        let violations = definition.parameters.validate(&parameters);
        if !violations.is_empty() {
            debug!(action = %name, count = violations.len(), "rejected invalid parameters");
            return Err(SwitchboardError::InvalidParameters {
                action: name.to_string(),
                violations,
            });
        }

        // Start transition and run share one task: a dropped caller cannot
        // leave the record in Running.
        let this = self.clone();
        let task_name = name.to_string();
        let handle = tokio::spawn(async move { this.start_and_run(task_name, parameters).await });

        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(action = %name, error = %join_err, "run task aborted");
                let detail = format!("run task aborted: {join_err}");
                let key = name.to_string();
                let patch = RecordPatch::failed(detail.clone());
                self.with_store(move |store| {
                    store.update(&key, &mut |current| {
                        if current.status == ActionStatus::Running {
                            Ok(patch.clone())
                        } else {
                            Ok(RecordPatch::default())
                        }
                    })
                })
                .await?;
                Err(SwitchboardError::Internal(detail))
            }
        }
    }

    /// Move records left in `Running` by a previous process to `Error`.
    ///
    /// Only meaningful at startup, before any trigger is accepted. Returns the
    /// number of records recovered.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let recovered = self
            .with_store(|store| {
                let mut count = 0;
                for record in store.list()? {
                    if record.status != ActionStatus::Running {
                        continue;
                    }
                    let mut was_running = false;
                    store.update(&record.name, &mut |current| {
                        was_running = current.status == ActionStatus::Running;
                        if was_running {
                            Ok(RecordPatch::failed(RECOVERED_RESULT))
                        } else {
                            Ok(RecordPatch::default())
                        }
                    })?;
                    if was_running {
                        count += 1;
                    }
                }
                Ok(count)
            })
            .await?;
        if recovered > 0 {
            warn!(count = recovered, "recovered actions interrupted by restart");
        }
        Ok(recovered)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn definition(&self, name: &str) -> Result<&ActionDefinition> {
        self.catalog
            .find(name)
            .ok_or_else(|| SwitchboardError::ActionNotFound(name.to_string()))
    }

    /// Atomically move `name` into `Running`, then execute and record it.
    async fn start_and_run(
        &self,
        name: String,
        parameters: Map<String, Value>,
    ) -> Result<TriggerOutcome> {
        let started_at = Utc::now();
        let key = name.clone();
        self.with_store(move |store| {
            store.update(&key, &mut |current| {
                ensure_runnable(current)?;
                Ok(RecordPatch::started(started_at))
            })
        })
        .await?;

        let run_id = Uuid::new_v4().to_string();
        info!(action = %name, run_id = %run_id, "action started");
        self.execute_and_record(name, run_id, started_at, parameters)
            .await
    }

    async fn execute_and_record(
        &self,
        name: String,
        run_id: String,
        started_at: DateTime<Utc>,
        parameters: Map<String, Value>,
    ) -> Result<TriggerOutcome> {
        let clock = Instant::now();
        let result = self.execute(&name, &run_id, &parameters).await;
        let duration_ms = u64::try_from(clock.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(output) => {
                let key = name.clone();
                let patch = RecordPatch::completed(output.clone());
                self.with_store(move |store| store.upsert(&key, &patch))
                    .await?;
                info!(action = %name, run_id = %run_id, duration_ms, "action completed");
                Ok(TriggerOutcome {
                    action_name: name,
                    run_id,
                    status: ActionStatus::Completed,
                    last_run_at: started_at,
                    last_result: output,
                    duration_ms,
                })
            }
            Err(err) => {
                warn!(action = %name, run_id = %run_id, duration_ms, error = %err, "action failed");
                let key = name.clone();
                let patch = RecordPatch::failed(err.to_string());
                if let Err(store_err) = self
                    .with_store(move |store| store.upsert(&key, &patch))
                    .await
                {
                    error!(action = %name, run_id = %run_id, error = %store_err, "could not record action failure");
                    return Err(store_err);
                }
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        name: &str,
        run_id: &str,
        parameters: &Map<String, Value>,
    ) -> Result<String> {
        let template = self
            .commands
            .get(name)
            .ok_or_else(|| SwitchboardError::CommandNotMapped(name.to_string()))?;

        let mut command = template.render(parameters);
        command
            .env
            .insert("SWITCHBOARD_ACTION".to_string(), name.to_string());
        command
            .env
            .insert("SWITCHBOARD_RUN_ID".to_string(), run_id.to_string());
        debug!(action = %name, program = %command.program, args = ?command.args, "spawning command");

        Ok(self.runner.run(&command).await?)
    }

    /// Run a blocking store operation off the async worker threads.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&dyn RecordStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| SwitchboardError::Store(format!("store task failed: {e}")))?
    }
}

/// A run may start only when the action is enabled and not already running.
fn ensure_runnable(record: &ActionRecord) -> Result<()> {
    if !record.enabled {
        return Err(SwitchboardError::ActionDisabled(record.name.clone()));
    }
    if record.status == ActionStatus::Running {
        return Err(SwitchboardError::AlreadyRunning(record.name.clone()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
