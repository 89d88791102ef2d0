//! Plain-text rendering for terminal output.

use client::ConnectionStatus;
use client::SessionSnapshot;
use records::{
    AgentInfo, AgentStatus, DeploymentEvent, DeploymentRecord, LogGroup, agent_display_name,
    format_log_timestamp,
};
use transcript::ChatMessage;

pub fn agent_line(agent: &AgentInfo) -> String {
    let status = match agent.status {
        AgentStatus::Available => "available",
        AgentStatus::Busy => "busy",
        AgentStatus::Unavailable => "unavailable",
    };
    format!(
        "{} {:<12} {:<16} {:<11} {}",
        agent.icon, agent.name, agent.id, status, agent.role
    )
}

/// One row of `deployments list`; deployments that can still change are
/// tagged `(live)`.
pub fn deployment_line(record: &DeploymentRecord) -> String {
    let mut line = format!(
        "{}  {:<11}  {}  {}  {}",
        format_log_timestamp(record.timestamp),
        record.status.label(),
        record.deployment_id,
        record.stack_name,
        record.region
    );
    if !record.status.is_terminal() {
        line.push_str("  (live)");
    }
    line
}

pub fn deployment_event_line(event: &DeploymentEvent) -> String {
    let mut line = format!(
        "{}  {:<24}  {}  {}",
        format_log_timestamp(event.timestamp),
        event.status,
        event.logical_resource_id,
        event.resource_type
    );
    if let Some(reason) = event.status_reason.as_deref().filter(|reason| !reason.is_empty()) {
        line.push_str("  ");
        line.push_str(reason);
    }
    line
}

pub fn log_group_line(group: &LogGroup) -> String {
    format!("{}  ({} bytes)", group.name, group.stored_bytes)
}

/// Who a reply is shown as. Falls back from the explicit name to the roster.
pub fn speaker(message: &ChatMessage) -> String {
    match (&message.agent_name, &message.agent_id) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(agent_id)) => agent_display_name(agent_id),
        _ => "assistant".to_owned(),
    }
}

pub fn status_line(snapshot: &SessionSnapshot) -> String {
    match snapshot.status {
        ConnectionStatus::Connecting => "connecting...".to_owned(),
        ConnectionStatus::Connected => "connected".to_owned(),
        ConnectionStatus::Disconnected if snapshot.retry_count == 0 => {
            "offline (canned replies)".to_owned()
        }
        ConnectionStatus::Disconnected | ConnectionStatus::Error => format!(
            "offline, reconnect attempt {} (canned replies)",
            snapshot.retry_count
        ),
    }
}

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;
