//! # Output Rendering
//!
//! Formatting for inspection results, probe reports, messages, and
//! connection events.
//!
//! Tables compute their column widths from the data, so they stay aligned
//! for any queue or host names. JSON and YAML output serializes the same
//! structures the library exposes, so scripted callers see the fields a
//! library caller would.

use crate::{CliError, OutputFormat};
use queue_scout_core::{Connection, ConnectionEvent, QueueSnapshot};
use queue_transport::QueueMessage;
use serde::Serialize;

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

// ============================================================================
// Probe Reports
// ============================================================================

/// Outcome of a connectivity probe, with timing measured by the caller
#[derive(Debug, Clone, Serialize)]
pub struct ProbeReport {
    /// Host as the user spelled it.
    pub host: String,

    /// Machine name the queue service reported.
    pub machine_name: String,

    /// Service version, when the host reports one.
    pub service_version: Option<String>,

    /// Wall-clock time the probe took.
    pub elapsed_ms: u64,
}

// ============================================================================
// Connection Listings
// ============================================================================

/// Render connection listings in the requested format
pub fn render_connections(
    connections: &[Connection],
    format: OutputFormat,
) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => to_json(connections),
        OutputFormat::Yaml => to_yaml(connections),
        OutputFormat::Text => Ok(connections_text(connections)),
        OutputFormat::Table => Ok(connections_table(connections)),
    }
}

fn connections_text(connections: &[Connection]) -> String {
    if connections.is_empty() {
        return "No hosts connected.".to_string();
    }

    let mut lines = Vec::new();
    for connection in connections {
        lines.push(connection_heading(connection));
        for queue in &connection.queues {
            lines.push(queue_line(queue));
        }
    }
    lines.join("\n")
}

fn connections_table(connections: &[Connection]) -> String {
    if connections.is_empty() {
        return "No hosts connected.".to_string();
    }

    let mut sections = Vec::new();
    for connection in connections {
        let mut section = connection_heading(connection);
        section.push('\n');
        section.push_str(&queue_table(&connection.queues));
        sections.push(section);
    }
    sections.join("\n\n")
}

fn connection_heading(connection: &Connection) -> String {
    let mut heading = format!(
        "{}: {} ({} queues",
        connection.host,
        connection.status,
        connection.queue_count(),
    );
    if connection.hidden_system_queues > 0 {
        heading.push_str(&format!(
            ", {} system hidden",
            connection.hidden_system_queues
        ));
    }
    heading.push(')');
    heading
}

fn queue_line(queue: &QueueSnapshot) -> String {
    if !queue.accessible {
        let reason = queue.error.as_deref().unwrap_or("access failed");
        return format!("  {}: inaccessible ({})", queue.name, reason);
    }

    let mut line = format!("  {}: {} messages", queue.name, queue.message_count);
    if queue.journal_message_count > 0 {
        line.push_str(&format!(", {} in journal", queue.journal_message_count));
    }
    line
}

fn queue_table(queues: &[QueueSnapshot]) -> String {
    if queues.is_empty() {
        return "  (no queues)".to_string();
    }

    let name_width = queues
        .iter()
        .map(|queue| queue.name.len())
        .fold("NAME".len(), usize::max);
    let category_width = queues
        .iter()
        .map(|queue| queue.category.to_string().len())
        .fold("CATEGORY".len(), usize::max);

    let mut lines = vec![format!(
        "  {:<name_width$}  {:<category_width$}  {:>8}  {:>7}  STATE",
        "NAME", "CATEGORY", "MESSAGES", "JOURNAL",
    )];
    for queue in queues {
        let state = if queue.accessible { "ok" } else { "denied" };
        lines.push(format!(
            "  {:<name_width$}  {:<category_width$}  {:>8}  {:>7}  {}",
            queue.name,
            queue.category.to_string(),
            queue.message_count,
            queue.journal_message_count,
            state,
        ));
    }
    lines.join("\n")
}

// ============================================================================
// Messages
// ============================================================================

/// Render peeked messages in the requested format
pub fn render_messages(messages: &[QueueMessage], format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => to_json(messages),
        OutputFormat::Yaml => to_yaml(messages),
        OutputFormat::Text => Ok(messages_text(messages)),
        OutputFormat::Table => Ok(messages_table(messages)),
    }
}

fn messages_text(messages: &[QueueMessage]) -> String {
    if messages.is_empty() {
        return "No messages.".to_string();
    }

    let mut lines = Vec::new();
    for message in messages {
        let label = if message.label.is_empty() {
            "(no label)"
        } else {
            &message.label
        };
        lines.push(format!(
            "{} [{}] {} bytes, sent {}",
            message.id,
            label,
            message.body_size(),
            message.sent_at,
        ));
        if let Some(text) = body_preview(message) {
            lines.push(format!("  {text}"));
        }
    }
    lines.join("\n")
}

fn messages_table(messages: &[QueueMessage]) -> String {
    if messages.is_empty() {
        return "No messages.".to_string();
    }

    let id_width = messages
        .iter()
        .map(|message| message.id.as_str().len())
        .fold("ID".len(), usize::max);
    let label_width = messages
        .iter()
        .map(|message| message.label.len())
        .fold("LABEL".len(), usize::max);

    let mut lines = vec![format!(
        "{:<id_width$}  {:<label_width$}  {:>8}  SENT AT",
        "ID", "LABEL", "BYTES",
    )];
    for message in messages {
        lines.push(format!(
            "{:<id_width$}  {:<label_width$}  {:>8}  {}",
            message.id.as_str(),
            message.label,
            message.body_size(),
            message.sent_at,
        ));
    }
    lines.join("\n")
}

/// First 60 characters of the body when it is readable text
fn body_preview(message: &QueueMessage) -> Option<String> {
    let text = message.body_text()?.trim();
    if text.is_empty() {
        return None;
    }

    let mut preview: String = text.chars().take(60).collect();
    if text.chars().nth(60).is_some() {
        preview.push_str("...");
    }
    Some(preview)
}

// ============================================================================
// Probes, Events, and Watch Lines
// ============================================================================

/// Render a probe report in the requested format
pub fn render_probe(report: &ProbeReport, format: OutputFormat) -> Result<String, CliError> {
    match format {
        OutputFormat::Json => to_json(report),
        OutputFormat::Yaml => to_yaml(report),
        OutputFormat::Text | OutputFormat::Table => Ok(probe_text(report)),
    }
}

fn probe_text(report: &ProbeReport) -> String {
    let version = report.service_version.as_deref().unwrap_or("unknown");
    format!(
        "Host '{}' is reachable as '{}' (service version {}, {} ms)",
        report.host, report.machine_name, version, report.elapsed_ms,
    )
}

/// One line describing a lifecycle event
pub fn render_event(event: &ConnectionEvent) -> String {
    match event {
        ConnectionEvent::StateChanged {
            previous_status,
            new_status,
            ..
        } => format!("state: {previous_status} -> {new_status}"),
        ConnectionEvent::Refreshed { queue_count, .. } => {
            format!("refreshed: {queue_count} queues")
        }
        ConnectionEvent::Failed {
            error_message,
            will_retry,
            retry_attempt,
            ..
        } => {
            let retry = if *will_retry { ", will retry" } else { "" };
            format!("attempt {retry_attempt} failed{retry}: {error_message}")
        }
    }
}

/// Opening line printed when a watch starts
pub fn render_watch_header(connection: &Connection) -> String {
    format!(
        "Watching '{}' ({} queues). Press Ctrl-C to stop.",
        connection.host,
        connection.queue_count(),
    )
}

/// Summary line printed after each watch refresh
pub fn render_refresh(connection: &Connection) -> String {
    let messages: u64 = connection
        .queues
        .iter()
        .map(|queue| queue.message_count)
        .sum();
    format!(
        "snapshot: {} queues, {} messages",
        connection.queue_count(),
        messages,
    )
}

// ============================================================================
// Serialization
// ============================================================================

pub(crate) fn to_json<T>(value: &T) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    serde_json::to_string_pretty(value).map_err(|error| CliError::CommandFailed {
        message: format!("could not render JSON output: {error}"),
    })
}

pub(crate) fn to_yaml<T>(value: &T) -> Result<String, CliError>
where
    T: Serialize + ?Sized,
{
    serde_yaml::to_string(value)
        .map(|rendered| rendered.trim_end().to_string())
        .map_err(|error| CliError::CommandFailed {
            message: format!("could not render YAML output: {error}"),
        })
}
