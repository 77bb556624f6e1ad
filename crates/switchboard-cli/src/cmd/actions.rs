use crate::output::{print_json, print_table, summarize};
use anyhow::Context;
use clap::Subcommand;
use serde_json::{Map, Value};
use std::path::Path;
use switchboard_core::orchestrator::{MergedAction, Orchestrator};

use super::open_orchestrator;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ActionsSubcommand {
    /// List every cataloged action with its current status
    List,

    /// Show one action in detail
    Show { name: String },

    /// Allow an action to be triggered
    Enable { name: String },

    /// Stop an action from being triggered (a running action finishes)
    Disable { name: String },

    /// Run an action now and wait for it to finish
    Trigger {
        name: String,

        /// A parameter as key=value; the value is parsed as JSON when it can be
        #[arg(long = "param", value_name = "KEY=VALUE")]
        params: Vec<String>,

        /// All parameters as one JSON object; --param entries override it
        #[arg(long = "params", value_name = "JSON")]
        params_json: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ActionsSubcommand, json: bool) -> anyhow::Result<()> {
    let (_, orchestrator) = open_orchestrator(root)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        // The record store is exclusively locked while open, so any run still
        // marked running belongs to a process that died mid-trigger.
        orchestrator
            .recover_interrupted()
            .await
            .context("failed to recover interrupted runs")?;
        dispatch(&orchestrator, subcmd, json).await
    })
}

async fn dispatch(
    orchestrator: &Orchestrator,
    subcmd: ActionsSubcommand,
    json: bool,
) -> anyhow::Result<()> {
    match subcmd {
        ActionsSubcommand::List => {
            let actions = orchestrator.list_actions().await?;
            if json {
                print_json(&actions)
            } else {
                print_list(&actions);
                Ok(())
            }
        }
        ActionsSubcommand::Show { name } => {
            let action = orchestrator.get_status(&name).await?;
            if json {
                print_json(&action)
            } else {
                print_detail(&action)
            }
        }
        ActionsSubcommand::Enable { name } => toggle(orchestrator, &name, true, json).await,
        ActionsSubcommand::Disable { name } => toggle(orchestrator, &name, false, json).await,
        ActionsSubcommand::Trigger {
            name,
            params,
            params_json,
        } => {
            let parameters = parse_parameters(params_json.as_deref(), &params)?;
            let outcome = orchestrator.trigger_action(&name, parameters).await?;
            if json {
                print_json(&outcome)
            } else {
                println!("{}", outcome.last_result);
                eprintln!(
                    "{} {} in {}ms (run {})",
                    outcome.action_name, outcome.status, outcome.duration_ms, outcome.run_id
                );
                Ok(())
            }
        }
    }
}

async fn toggle(
    orchestrator: &Orchestrator,
    name: &str,
    enable: bool,
    json: bool,
) -> anyhow::Result<()> {
    let action = orchestrator.toggle_action(name, enable).await?;
    if json {
        print_json(&action)
    } else {
        let state = if action.enabled { "enabled" } else { "disabled" };
        println!("{name}: {state}");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn print_list(actions: &[MergedAction]) {
    if actions.is_empty() {
        println!("No actions defined. Add some to .switchboard/config.yaml");
        return;
    }
    let rows: Vec<Vec<String>> = actions
        .iter()
        .map(|a| {
            vec![
                a.name.clone(),
                if a.enabled { "yes" } else { "no" }.to_string(),
                a.status.to_string(),
                a.last_run_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".into()),
                a.last_result
                    .as_deref()
                    .map(|r| summarize(r, 40))
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    print_table(&["NAME", "ENABLED", "STATUS", "LAST RUN", "RESULT"], &rows);
}

fn print_detail(action: &MergedAction) -> anyhow::Result<()> {
    println!("Name:        {}", action.name);
    println!("Description: {}", action.description);
    println!("Enabled:     {}", action.enabled);
    println!("Status:      {}", action.status);
    if !action.mapped {
        println!("Command:     (none configured)");
    }
    if let Some(at) = action.last_run_at {
        println!("Last run:    {}", at.to_rfc3339());
    }
    if let Some(result) = &action.last_result {
        println!("Last result:\n{result}");
    }
    if !action.parameters.properties.is_empty() {
        println!("Parameters:");
        for (name, prop) in &action.parameters.properties {
            let required = if action.parameters.required.contains(name) {
                " (required)"
            } else {
                ""
            };
            let description = prop.description.as_deref().unwrap_or_default();
            println!("  {name}: {}{required}  {description}", prop.value_type.as_str());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Parameter parsing
// ---------------------------------------------------------------------------

/// Merge `--params <json>` with repeated `--param key=value` flags.
fn parse_parameters(json: Option<&str>, pairs: &[String]) -> anyhow::Result<Map<String, Value>> {
    let mut params = match json {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("--params is not valid JSON")? {
            Value::Object(map) => map,
            other => anyhow::bail!("--params must be a JSON object, got {other}"),
        },
        None => Map::new(),
    };

    for pair in pairs {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("--param '{pair}' must be KEY=VALUE"))?;
        let key = key.trim();
        if key.is_empty() {
            anyhow::bail!("--param '{pair}' has an empty key");
        }
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        params.insert(key.to_string(), value);
    }

    Ok(params)
}
