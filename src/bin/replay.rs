//! Replay a registration scenario through the interception layer.
//!
//! Reads a JSON scenario, runs every step against an in-memory host with the
//! manager installed, and prints each target's recorded registrations.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin replay -- scenario.json
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG` — Tracing filter (default: "info")
//!
//! # Scenario format
//!
//! ```json
//! {
//!   "config": { "debug": true },
//!   "native_host": false,
//!   "targets": [
//!     { "name": "dialog", "id": "loginModal" },
//!     { "name": "ok", "parent": "dialog" }
//!   ],
//!   "callbacks": {
//!     "submit": { "name": "onSubmit" },
//!     "inline": { "source": "() => close()" }
//!   },
//!   "steps": [
//!     { "op": "add", "target": "ok", "event": "click", "callback": "submit" },
//!     { "op": "remove", "target": "ok", "event": "click", "callback": "submit", "options": true }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use serde_json::{json, Value};

use listener_guard::{
    Callback, Decision, EventListenerManager, EventTarget, Listener, ListenerOptions,
    ManagerConfig, MemoryHost,
};

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(default)]
    config: Option<ManagerConfig>,
    #[serde(default)]
    native_host: bool,
    targets: Vec<TargetSpec>,
    #[serde(default)]
    callbacks: HashMap<String, CallbackSpec>,
    steps: Vec<Step>,
}

#[derive(Debug, Deserialize)]
struct TargetSpec {
    name: String,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    classes: Vec<String>,
    #[serde(default)]
    parent: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CallbackSpec {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Op {
    Add,
    Remove,
}

#[derive(Debug, Deserialize)]
struct Step {
    op: Op,
    target: String,
    event: String,
    /// Label from `callbacks`; `null` stands for an absent listener.
    #[serde(default)]
    callback: Option<String>,
    #[serde(default)]
    options: ListenerOptions,
}

struct ReplayTarget {
    name: String,
    id: Option<String>,
    classes: Vec<String>,
    parent: Option<Arc<dyn EventTarget>>,
}

impl EventTarget for ReplayTarget {
    fn element_id(&self) -> Option<String> {
        self.id.clone()
    }

    fn class_names(&self) -> Vec<String> {
        self.classes.clone()
    }

    fn parent_target(&self) -> Option<Arc<dyn EventTarget>> {
        self.parent.clone()
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

fn build_targets(specs: Vec<TargetSpec>) -> Result<Vec<(String, Arc<dyn EventTarget>)>> {
    let mut built: Vec<(String, Arc<dyn EventTarget>)> = Vec::with_capacity(specs.len());
    for spec in specs {
        let parent = match &spec.parent {
            Some(parent) => Some(
                lookup(&built, parent)
                    .with_context(|| format!("target {:?} declared before its parent", spec.name))?,
            ),
            None => None,
        };
        let target: Arc<dyn EventTarget> = Arc::new(ReplayTarget {
            name: spec.name.clone(),
            id: spec.id,
            classes: spec.classes,
            parent,
        });
        built.push((spec.name, target));
    }
    Ok(built)
}

fn lookup(targets: &[(String, Arc<dyn EventTarget>)], name: &str) -> Result<Arc<dyn EventTarget>> {
    targets
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, t)| Arc::clone(t))
        .ok_or_else(|| anyhow!("unknown target {name:?}"))
}

fn build_callbacks(specs: HashMap<String, CallbackSpec>) -> HashMap<String, Listener> {
    specs
        .into_iter()
        .map(|(label, spec)| {
            let callback = match (spec.name, spec.source) {
                (Some(name), _) => Callback::named(name, |_e| {}),
                (None, Some(source)) => Callback::anonymous(source, |_e| {}),
                (None, None) => Callback::from_fn(|_e| {}),
            };
            (label, Listener::from(callback))
        })
        .collect()
}

fn describe(decision: &Decision) -> String {
    match decision {
        Decision::Bypassed => "bypassed".to_string(),
        Decision::Rejected { key } => format!("rejected {key}"),
        Decision::Accepted { key, swept } => format!("accepted {key} (swept {swept})"),
        Decision::Replaced { key, swept, .. } => format!("replaced {key} (swept {swept})"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: replay <scenario.json>"))?;
    let content =
        std::fs::read_to_string(&path).with_context(|| format!("failed to read {path}"))?;
    let scenario: Scenario =
        serde_json::from_str(&content).with_context(|| format!("invalid scenario {path}"))?;

    let host = if scenario.native_host {
        MemoryHost::native()
    } else {
        MemoryHost::new()
    };
    let mut manager = EventListenerManager::new(host);
    manager.install(scenario.config.unwrap_or_default());

    let targets = build_targets(scenario.targets)?;
    let callbacks = build_callbacks(scenario.callbacks);

    for (index, step) in scenario.steps.into_iter().enumerate() {
        let target = lookup(&targets, &step.target)?;
        let listener = match &step.callback {
            Some(label) => callbacks
                .get(label)
                .cloned()
                .ok_or_else(|| anyhow!("step {index}: unknown callback {label:?}"))?,
            None => Listener::Absent,
        };
        match step.op {
            Op::Add => {
                match manager.add_event_listener(&target, &step.event, &listener, step.options) {
                    Ok(decision) => {
                        tracing::info!("step {}: add {} -> {}", index, step.event, describe(&decision))
                    }
                    Err(e) => tracing::warn!("step {}: add {} failed: {}", index, step.event, e),
                }
            }
            Op::Remove => {
                if let Err(e) =
                    manager.remove_event_listener(&target, &step.event, &listener, step.options)
                {
                    tracing::warn!("step {}: remove {} failed: {}", index, step.event, e);
                }
            }
        }
    }

    let mut report = serde_json::Map::new();
    for (name, target) in &targets {
        let registrations: Value = match manager.inspect(target) {
            Some(snapshot) => snapshot
                .iter()
                .map(|(key, record)| {
                    json!({
                        "key": key.to_string(),
                        "event_type": record.event_type,
                        "capture": key.capture,
                        "identity": record.identity,
                        "options": record.options,
                    })
                })
                .collect(),
            None => Value::Null,
        };
        report.insert(
            name.clone(),
            json!({
                "registrations": registrations,
                "host_attachments": manager.host().total_active(target),
            }),
        );
    }
    println!("{}", serde_json::to_string_pretty(&Value::Object(report))?);

    manager.uninstall();
    Ok(())
}
