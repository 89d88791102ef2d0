//! Read-only studio records: log events, deployments and the agent roster.
//!
//! This crate is transport agnostic so the CLI and the client library can
//! both filter, sort and render records fetched over HTTP or a log tail.
//!
//! DESIGN
//! ======
//! Every function here is pure. Filtering returns borrowed subsequences in
//! input order and sorting returns a new list, so callers keep their originals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

// =============================================================================
// LOGS
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogGroup {
    pub name: String,
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub stored_bytes: u64,
    #[serde(default)]
    pub creation_time: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEvent {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub message: String,
    #[serde(default)]
    pub log_stream_name: String,
    #[serde(default)]
    pub ingestion_time: i64,
}

/// Criteria applied by [`filter_log_events`]. Empty keyword and `None`
/// bounds mean "no constraint".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogFilter {
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub start_time: Option<i64>,
    #[serde(default)]
    pub end_time: Option<i64>,
    #[serde(default)]
    pub log_group_name: String,
}

impl LogFilter {
    #[must_use]
    pub fn for_group(log_group_name: impl Into<String>) -> Self {
        Self {
            log_group_name: log_group_name.into(),
            ..Self::default()
        }
    }

    /// Whether `event` passes the keyword and time-range constraints.
    ///
    /// The group name is not checked here; it selects which events are
    /// fetched in the first place.
    #[must_use]
    pub fn matches(&self, event: &LogEvent) -> bool {
        if !self.keyword.is_empty()
            && !event
                .message
                .to_lowercase()
                .contains(&self.keyword.to_lowercase())
        {
            return false;
        }
        if self.start_time.is_some_and(|start| event.timestamp < start) {
            return false;
        }
        if self.end_time.is_some_and(|end| event.timestamp > end) {
            return false;
        }
        true
    }
}

/// Keep the events matching `filter`, preserving input order.
#[must_use]
pub fn filter_log_events<'a>(events: &'a [LogEvent], filter: &LogFilter) -> Vec<&'a LogEvent> {
    events.iter().filter(|event| filter.matches(event)).collect()
}

/// Render epoch milliseconds as `YYYY-MM-DD HH:MM:SS.mmm` in UTC.
///
/// Out-of-range inputs fall back to the raw number.
#[must_use]
pub fn format_log_timestamp(timestamp_ms: i64) -> String {
    let nanos = i128::from(timestamp_ms) * 1_000_000;
    let Ok(at) = OffsetDateTime::from_unix_timestamp_nanos(nanos) else {
        return timestamp_ms.to_string();
    };
    format!(
        "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}",
        at.year(),
        u8::from(at.month()),
        at.day(),
        at.hour(),
        at.minute(),
        at.second(),
        at.millisecond(),
    )
}

/// One display line: `{timestamp} [{stream}] {message}`.
#[must_use]
pub fn format_log_event(event: &LogEvent) -> String {
    format!(
        "{} [{}] {}",
        format_log_timestamp(event.timestamp),
        event.log_stream_name,
        event.message
    )
}

/// Decode one message from a live log tail.
///
/// # Errors
///
/// Returns the JSON error when `text` is not a log event.
pub fn decode_log_event(text: &str) -> Result<LogEvent, serde_json::Error> {
    serde_json::from_str(text)
}

/// Decode one message from a live deployment event feed.
///
/// # Errors
///
/// Returns the JSON error when `text` is not a deployment event.
pub fn decode_deployment_event(text: &str) -> Result<DeploymentEvent, serde_json::Error> {
    serde_json::from_str(text)
}

// =============================================================================
// DEPLOYMENTS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeploymentStatus {
    #[default]
    Pending,
    InProgress,
    Complete,
    Failed,
    RolledBack,
}

impl DeploymentStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::InProgress => "In Progress",
            Self::Complete => "Complete",
            Self::Failed => "Failed",
            Self::RolledBack => "Rolled Back",
        }
    }

    /// Whether the deployment can still change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::RolledBack)
    }
}

const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";
const TERMINAL_STACK_STATUSES: &[&str] = &[
    "CREATE_COMPLETE",
    "ROLLBACK_COMPLETE",
    "DELETE_COMPLETE",
    "UPDATE_COMPLETE",
];

/// A single stack resource transition reported during a deployment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentEvent {
    pub timestamp: i64,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub logical_resource_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
}

impl DeploymentEvent {
    /// Whether this event reports the whole stack reaching a final state.
    /// A live event feed can stop after it.
    #[must_use]
    pub fn ends_stack(&self) -> bool {
        self.resource_type == STACK_RESOURCE_TYPE
            && TERMINAL_STACK_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub deployment_id: String,
    #[serde(default)]
    pub status: DeploymentStatus,
    pub timestamp: i64,
    #[serde(default)]
    pub stack_name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub events: Vec<DeploymentEvent>,
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

/// Newest first. Records sharing a timestamp keep their input order.
#[must_use]
pub fn sort_deployments_by_timestamp(deployments: &[DeploymentRecord]) -> Vec<DeploymentRecord> {
    let mut sorted = deployments.to_vec();
    sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    sorted
}

// =============================================================================
// AGENTS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    #[default]
    Available,
    Busy,
    Unavailable,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub status: AgentStatus,
}

const DEFAULT_ROSTER: &[(&str, &str, &str, &str, &[&str])] = &[
    (
        "conductor",
        "Conductor",
        "🎼",
        "Infrastructure Orchestrator",
        &[
            "Deployment orchestration",
            "CloudFormation generation",
            "Cost estimation",
            "Architecture design",
        ],
    ),
    (
        "recon",
        "Recon",
        "🔍",
        "Repository Scout",
        &["Repo analysis", "Tech stack detection", "Dependency scanning", "Security audit"],
    ),
    (
        "provisioner",
        "Provisioner",
        "🏗️",
        "Infrastructure Provisioner",
        &[
            "CloudFormation templates",
            "EC2 / RDS / ALB provisioning",
            "Stage-1 & production modes",
        ],
    ),
    (
        "deployer",
        "Deployer",
        "🚀",
        "Application Deployer",
        &["App deployment", "ALB target registration", "Health check verification"],
    ),
    (
        "sheriff",
        "Sheriff",
        "🔒",
        "Security Agent",
        &["Security group management", "IAM policy enforcement", "Compliance checks"],
    ),
    (
        "qa",
        "QA",
        "🧪",
        "Quality Assurance",
        &["Post-deploy verification", "Endpoint health checks", "Integration testing"],
    ),
    (
        "ops",
        "Ops",
        "📊",
        "Observability",
        &["CloudWatch dashboards", "X-Ray tracing setup", "Metrics & alerting"],
    ),
    (
        "medic",
        "Medic",
        "🩺",
        "Error Recovery",
        &["Failure analysis", "Automated fix suggestions", "Retry orchestration"],
    ),
    (
        "janitor",
        "Janitor",
        "🧹",
        "Cleanup & Maintenance",
        &["Unused resource detection", "Cost optimization", "Drift detection"],
    ),
    (
        "compiler",
        "Compiler",
        "⚙️",
        "Build Agent",
        &["Application build", "Dependency resolution", "Artifact preparation"],
    ),
];

/// Built-in roster shown when the agent directory cannot be reached.
#[must_use]
pub fn default_agents() -> Vec<AgentInfo> {
    DEFAULT_ROSTER
        .iter()
        .map(|(id, name, icon, role, capabilities)| AgentInfo {
            id: (*id).to_owned(),
            name: (*name).to_owned(),
            icon: (*icon).to_owned(),
            role: (*role).to_owned(),
            capabilities: capabilities.iter().map(|c| (*c).to_owned()).collect(),
            status: AgentStatus::Available,
        })
        .collect()
}

/// Display name for an agent id, falling back to the id itself.
#[must_use]
pub fn agent_display_name(agent_id: &str) -> String {
    DEFAULT_ROSTER
        .iter()
        .find(|(id, ..)| *id == agent_id)
        .map_or_else(|| agent_id.to_owned(), |(_, name, ..)| (*name).to_owned())
}

// =============================================================================
// AUTH
// =============================================================================

/// Result of a credential check against the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthValidation {
    pub ok: bool,
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
