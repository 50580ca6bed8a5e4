//! Subcommands of the `taskmgmt` binary.
//!
//! Every command resolves to one or more resource operations and renders
//! the resulting state as pretty JSON. Warnings travel next to the output
//! so the binary can print them to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Subcommand, ValueEnum};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use taskmgmt_core::{
    composite_id,
    diagnostics::Diagnostics,
    proxy::FlowRuleProxy,
    resources::{
        export, flow_rule, workbin, worktype, worktype_status, worktype_status_transition, Applied,
        FlowRuleConfig, StatusTransitionConfig, WorkbinConfig, WorktypeConfig, WorktypeStatusConfig,
    },
    rules::{DateBased, FlowRuleKind, OnAttributeChange, OnCreate},
    RetryPolicy,
};

use crate::setup::App;

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage worktypes and their status graphs
    Worktype {
        #[command(subcommand)]
        action: WorktypeAction,
    },
    /// Manage workbins
    Workbin {
        #[command(subcommand)]
        action: WorkbinAction,
    },
    /// Manage a single worktype status by its `<worktypeId>/<statusId>` id
    Status {
        #[command(subcommand)]
        action: StatusAction,
    },
    /// Manage the transitions of an existing status
    Transition {
        #[command(subcommand)]
        action: TransitionAction,
    },
    /// Manage worktype flow rules
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },
    /// Resolve a name to an id
    Lookup {
        #[command(subcommand)]
        target: LookupTarget,
    },
    /// List every workbin, worktype, status and flow rule
    Export,
}

#[derive(Debug, Subcommand)]
pub enum WorktypeAction {
    /// Create or update (matched by name) a worktype from a TOML or JSON file
    Apply { file: PathBuf },
    Show { id: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum WorkbinAction {
    /// Create or update (matched by name) a workbin from a TOML or JSON file
    Apply { file: PathBuf },
    Show { id: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum StatusAction {
    /// Create or update (matched by name within the worktype) a status
    Apply { file: PathBuf },
    Show { id: String },
    Delete { id: String },
}

#[derive(Debug, Subcommand)]
pub enum TransitionAction {
    /// Set the transitions described in a TOML or JSON file
    Apply { file: PathBuf },
    Show { id: String },
    /// Release the transitions the file set
    Delete { file: PathBuf },
}

#[derive(Debug, Subcommand)]
pub enum RuleAction {
    /// Create or update (matched by name within the worktype) a flow rule
    Apply { kind: RuleKind, file: PathBuf },
    /// Show a rule by its `<worktypeId>/<ruleId>` id
    Show { kind: RuleKind, id: String },
    Delete { kind: RuleKind, id: String },
}

#[derive(Debug, Subcommand)]
pub enum LookupTarget {
    Workbin { name: String },
    Worktype { name: String },
    Status { worktype_id: String, name: String },
    Rule { kind: RuleKind, worktype_id: String, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RuleKind {
    DateBased,
    AttributeChange,
    OnCreate,
}

/// What a command produced
#[derive(Debug, Default)]
pub struct Output {
    pub body: String,
    pub warnings: Diagnostics,
}

impl Output {
    fn json<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self {
            body: serde_json::to_string_pretty(value).context("Failed to render output")?,
            warnings: Diagnostics::default(),
        })
    }

    fn applied<T: Serialize>(applied: Applied<T>) -> Result<Self> {
        let mut output = Self::json(&applied.state)?;
        output.warnings = applied.warnings;
        Ok(output)
    }

    fn text(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            warnings: Diagnostics::default(),
        }
    }
}

/// Run one command against the app's backend
pub async fn run(app: &App, command: Command) -> Result<Output> {
    match command {
        Command::Worktype { action } => run_worktype(app, action).await,
        Command::Workbin { action } => run_workbin(app, action).await,
        Command::Status { action } => run_status(app, action).await,
        Command::Transition { action } => run_transition(app, action).await,
        Command::Rule { action } => run_rule(app, action).await,
        Command::Lookup { target } => run_lookup(app, target).await,
        Command::Export => {
            let inventory = export::export_all(&app.proxies).await?;
            Output::json(&inventory)
        }
    }
}

async fn run_worktype(app: &App, action: WorktypeAction) -> Result<Output> {
    let proxy = &app.proxies.worktypes;
    match action {
        WorktypeAction::Apply { file } => {
            let config: WorktypeConfig = read_config(&file)?;
            let applied = match proxy.get_id_by_name(&config.name).await {
                Ok(id) => {
                    info!(worktype_id = %id, name = %config.name, "Updating existing worktype");
                    worktype::update(proxy, &app.policy, &id, &config).await?
                }
                Err(err) if err.is_not_found() => worktype::create(proxy, &app.policy, &config).await?,
                Err(err) => return Err(err).context(format!("Failed to look up worktype {}", config.name)),
            };
            Output::applied(applied)
        }
        WorktypeAction::Show { id } => match worktype::read(proxy, &app.policy, &id).await? {
            Some(state) => Output::json(&state),
            None => bail!("Worktype {id} not found"),
        },
        WorktypeAction::Delete { id } => {
            worktype::delete(proxy, &app.policy, &id).await?;
            Ok(Output::text(format!("Deleted worktype {id}")))
        }
    }
}

async fn run_workbin(app: &App, action: WorkbinAction) -> Result<Output> {
    let proxy = &app.proxies.workbins;
    match action {
        WorkbinAction::Apply { file } => {
            let config: WorkbinConfig = read_config(&file)?;
            let state = match proxy.get_id_by_name(&config.name).await {
                Ok(id) => {
                    info!(workbin_id = %id, name = %config.name, "Updating existing workbin");
                    workbin::update(proxy, &app.policy, &id, &config).await?
                }
                Err(err) if err.is_not_found() => workbin::create(proxy, &app.policy, &config).await?,
                Err(err) => return Err(err).context(format!("Failed to look up workbin {}", config.name)),
            };
            Output::json(&state)
        }
        WorkbinAction::Show { id } => match workbin::read(proxy, &app.policy, &id).await? {
            Some(state) => Output::json(&state),
            None => bail!("Workbin {id} not found"),
        },
        WorkbinAction::Delete { id } => {
            workbin::delete(proxy, &app.policy, &id).await?;
            Ok(Output::text(format!("Deleted workbin {id}")))
        }
    }
}

async fn run_status(app: &App, action: StatusAction) -> Result<Output> {
    let proxy = &app.proxies.worktypes;
    match action {
        StatusAction::Apply { file } => {
            let config: WorktypeStatusConfig = read_config(&file)?;
            let state = match proxy.get_status_id_by_name(&config.worktype_id, &config.name).await {
                Ok(status_id) => {
                    let id = composite_id::compose(&config.worktype_id, &status_id);
                    info!(status = %id, "Updating existing status");
                    worktype_status::update(proxy, &app.policy, &id, &config).await?
                }
                Err(err) if err.is_not_found() => worktype_status::create(proxy, &app.policy, &config).await?,
                Err(err) => return Err(err).context(format!("Failed to look up status {}", config.name)),
            };
            Output::json(&state)
        }
        StatusAction::Show { id } => match worktype_status::read(proxy, &app.policy, &id).await? {
            Some(state) => Output::json(&state),
            None => bail!("Status {id} not found"),
        },
        StatusAction::Delete { id } => {
            worktype_status::delete(proxy, &app.policy, &id).await?;
            Ok(Output::text(format!("Deleted status {id}")))
        }
    }
}

async fn run_transition(app: &App, action: TransitionAction) -> Result<Output> {
    let proxy = &app.proxies.worktypes;
    match action {
        TransitionAction::Apply { file } => {
            let config: StatusTransitionConfig = read_config(&file)?;
            let state = worktype_status_transition::create(proxy, &app.policy, &config).await?;
            Output::json(&state)
        }
        TransitionAction::Show { id } => match worktype_status_transition::read(proxy, &app.policy, &id).await? {
            Some(state) => Output::json(&state),
            None => bail!("Status transition {id} not found"),
        },
        TransitionAction::Delete { file } => {
            let config: StatusTransitionConfig = read_config(&file)?;
            let id = config.id();
            worktype_status_transition::delete(proxy, &app.policy, &id, &config).await?;
            Ok(Output::text(format!("Released transitions of status {id}")))
        }
    }
}

async fn run_rule(app: &App, action: RuleAction) -> Result<Output> {
    let proxies = &app.proxies;
    let policy = &app.policy;
    match action {
        RuleAction::Apply { kind, file } => match kind {
            RuleKind::DateBased => apply_rule(&proxies.date_based_rules, policy, &file).await,
            RuleKind::AttributeChange => apply_rule(&proxies.attribute_change_rules, policy, &file).await,
            RuleKind::OnCreate => apply_rule(&proxies.on_create_rules, policy, &file).await,
        },
        RuleAction::Show { kind, id } => match kind {
            RuleKind::DateBased => show_rule(&proxies.date_based_rules, policy, &id).await,
            RuleKind::AttributeChange => show_rule(&proxies.attribute_change_rules, policy, &id).await,
            RuleKind::OnCreate => show_rule(&proxies.on_create_rules, policy, &id).await,
        },
        RuleAction::Delete { kind, id } => {
            match kind {
                RuleKind::DateBased => flow_rule::delete(&proxies.date_based_rules, policy, &id).await?,
                RuleKind::AttributeChange => flow_rule::delete(&proxies.attribute_change_rules, policy, &id).await?,
                RuleKind::OnCreate => flow_rule::delete(&proxies.on_create_rules, policy, &id).await?,
            }
            Ok(Output::text(format!("Deleted rule {id}")))
        }
    }
}

async fn apply_rule<K: FlowRuleKind>(proxy: &FlowRuleProxy<K>, policy: &RetryPolicy, file: &Path) -> Result<Output> {
    let config: FlowRuleConfig<K> = read_config(file)?;
    let state = match proxy.get_id_by_name(&config.worktype_id, config.name()).await {
        Ok(rule_id) => {
            let id = composite_id::compose(&config.worktype_id, &rule_id);
            info!(rule = %id, kind = K::DISPLAY, "Updating existing rule");
            flow_rule::update(proxy, policy, &id, &config).await?
        }
        Err(err) if err.is_not_found() => flow_rule::create(proxy, policy, &config).await?,
        Err(err) => return Err(err).context(format!("Failed to look up {} {}", K::DISPLAY, config.name())),
    };
    Output::json(&state)
}

async fn show_rule<K: FlowRuleKind>(proxy: &FlowRuleProxy<K>, policy: &RetryPolicy, id: &str) -> Result<Output> {
    match flow_rule::read(proxy, policy, id).await? {
        Some(state) => Output::json(&state),
        None => bail!("{} {id} not found", K::DISPLAY),
    }
}

async fn run_lookup(app: &App, target: LookupTarget) -> Result<Output> {
    let proxies = &app.proxies;
    let policy = &app.policy;
    let id = match target {
        LookupTarget::Workbin { name } => workbin::lookup(&proxies.workbins, policy, &name).await?,
        LookupTarget::Worktype { name } => worktype::lookup(&proxies.worktypes, policy, &name).await?,
        LookupTarget::Status { worktype_id, name } => {
            worktype_status::lookup(&proxies.worktypes, policy, &worktype_id, &name).await?
        }
        LookupTarget::Rule { kind, worktype_id, name } => match kind {
            RuleKind::DateBased => {
                flow_rule::lookup::<DateBased>(&proxies.date_based_rules, policy, &worktype_id, &name).await?
            }
            RuleKind::AttributeChange => {
                flow_rule::lookup::<OnAttributeChange>(&proxies.attribute_change_rules, policy, &worktype_id, &name)
                    .await?
            }
            RuleKind::OnCreate => {
                flow_rule::lookup::<OnCreate>(&proxies.on_create_rules, policy, &worktype_id, &name).await?
            }
        },
    };
    Ok(Output::text(id))
}

/// Parse a desired configuration; `.json` files as JSON, anything else as TOML
pub fn read_config<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display())),
        _ => toml::from_str(&raw).with_context(|| format!("Invalid TOML in {}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use taskmgmt_core::models::StatusCategory;
    use tempfile::NamedTempFile;

    fn temp_file(suffix: &str) -> NamedTempFile {
        tempfile::Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_read_worktype_toml() {
        let mut file = temp_file(".toml");
        write!(
            file,
            r#"
name = "Approvals"
default_workbin_id = "wb-1"
default_status_name = "Approved"

[[statuses]]
name = "Approved"
category = "Closed"
destination_status_names = ["Rejected"]
default_destination_status_name = "Rejected"

[[statuses]]
name = "Rejected"
category = "Closed"
"#
        )
        .unwrap();

        let config: WorktypeConfig = read_config(file.path()).unwrap();
        assert_eq!(config.name, "Approvals");
        assert_eq!(config.statuses.len(), 2);
        assert_eq!(config.statuses[0].category, StatusCategory::Closed);
        assert_eq!(config.statuses[0].default_destination(), Some("Rejected"));
    }

    #[test]
    fn test_read_rule_json() {
        let mut file = temp_file(".json");
        write!(
            file,
            r#"{{"worktype_id": "wt-1", "name": "Due soon",
                "condition": {{"attribute": "dateDue", "relativeMinutesToInvocation": -60}}}}"#
        )
        .unwrap();

        let config: FlowRuleConfig<DateBased> = read_config(file.path()).unwrap();
        assert_eq!(config.worktype_id, "wt-1");
        assert_eq!(config.rule.condition.relative_minutes_to_invocation, -60);
    }

    #[test]
    fn test_read_transition_toml() {
        let mut file = temp_file(".toml");
        write!(
            file,
            r#"
worktype_id = "wt-1"
status_id = "wt-1/st-1"
destination_status_ids = ["wt-1/st-2", "st-3"]
default_destination_status_id = "wt-1/st-2"
status_transition_time = "09:00:00"
"#
        )
        .unwrap();

        let config: StatusTransitionConfig = read_config(file.path()).unwrap();
        assert_eq!(config.id(), "wt-1/st-1");
        assert_eq!(config.to_update().destination_status_ids, Some(vec!["st-2".to_string(), "st-3".to_string()]));
        assert_eq!(config.status_transition_delay_seconds, None);
    }

    #[test]
    fn test_read_config_errors_name_the_file() {
        let err = read_config::<WorkbinConfig>(Path::new("/nonexistent/workbin.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/workbin.toml"));

        let mut file = temp_file(".json");
        write!(file, "not json").unwrap();
        let err = read_config::<WorkbinConfig>(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Invalid JSON"));
    }
}
