//! Full-update progress reporting.
//!
//! Reports observable progress during `mirror update` so users see which
//! phase a run is in and how much is left. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for a full update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateProgressEvent {
    /// Waiting on the remote tree listing.
    FetchingListing { tree_id: String },
    /// Deleting the previous tree.
    Wiping,
    /// n listing entries materialized out of total.
    Materializing { n: u64, total: u64 },
    /// n markdown blobs stored out of total.
    FetchingContent { n: u64, total: u64 },
    /// n directories resolved out of total.
    Resolving { n: u64, total: u64 },
}

impl UpdateProgressEvent {
    fn phase(&self) -> &'static str {
        match self {
            UpdateProgressEvent::FetchingListing { .. } => "listing",
            UpdateProgressEvent::Wiping => "wiping",
            UpdateProgressEvent::Materializing { .. } => "materializing",
            UpdateProgressEvent::FetchingContent { .. } => "fetching",
            UpdateProgressEvent::Resolving { .. } => "resolving",
        }
    }

    fn counts(&self) -> Option<(u64, u64)> {
        match self {
            UpdateProgressEvent::Materializing { n, total }
            | UpdateProgressEvent::FetchingContent { n, total }
            | UpdateProgressEvent::Resolving { n, total } => Some((*n, *total)),
            _ => None,
        }
    }
}

/// Reports update progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the ingest pipeline.
    fn report(&self, event: UpdateProgressEvent);
}

/// Human-friendly progress on stderr: "update  resolving  12 / 40".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: UpdateProgressEvent) {
        let line = match (&event, event.counts()) {
            (UpdateProgressEvent::FetchingListing { tree_id }, _) => {
                format!("update  listing tree {}...\n", tree_id)
            }
            (_, Some((n, total))) => format!(
                "update  {}  {} / {}\n",
                event.phase(),
                format_number(n),
                format_number(total)
            ),
            (_, None) => format!("update  {}...\n", event.phase()),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: UpdateProgressEvent) {
        let mut obj = serde_json::json!({
            "event": "progress",
            "phase": event.phase(),
        });
        if let UpdateProgressEvent::FetchingListing { tree_id } = &event {
            obj["tree_id"] = serde_json::json!(tree_id);
        }
        if let Some((n, total)) = event.counts() {
            obj["n"] = serde_json::json!(n);
            obj["total"] = serde_json::json!(total);
        }
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: UpdateProgressEvent) {}
}

fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse a `--progress` value; `None` means "pick by TTY".
    pub fn from_flag(flag: Option<&str>) -> anyhow::Result<Self> {
        match flag {
            None => Ok(Self::default_for_tty()),
            Some("off") => Ok(ProgressMode::Off),
            Some("human") => Ok(ProgressMode::Human),
            Some("json") => Ok(ProgressMode::Json),
            Some(other) => anyhow::bail!(
                "Unknown progress mode: '{}'. Must be off, human, or json.",
                other
            ),
        }
    }

    /// Build a reporter for this mode. Caller can pass it to ingest.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
