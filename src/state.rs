//! Run state: the single mutable record threaded through one execution.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Outcome event emitted by a phase after its gate resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Event {
    Complete,
    Approved,
    Rejected,
    Pass,
}

impl Event {
    /// The transition-map key this event resolves to. `Rejected` has no key
    /// and therefore always falls through to a phase's default route.
    pub fn transition_key(self) -> Option<&'static str> {
        match self {
            Event::Complete => Some("on_complete"),
            Event::Approved => Some("on_approved"),
            Event::Pass => Some("on_pass"),
            Event::Rejected => None,
        }
    }
}

/// Mutable run record, exclusively owned by the runner for one execution.
///
/// The artifact map grows monotonically: an entry is written at most once per
/// phase per run, even when a rework loop revisits the phase.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunState {
    /// Id of the phase currently executing.
    pub phase: String,
    /// Project context seeded at run start.
    pub ctx: serde_json::Map<String, Value>,
    /// Phase id → location of the artifact that phase produced.
    pub artifacts: BTreeMap<String, PathBuf>,
    /// Approver id → approval decision.
    pub approvals: BTreeMap<String, bool>,
    /// Most recent outcome event.
    pub last_event: Option<Event>,
}

impl RunState {
    pub fn new(
        ctx: serde_json::Map<String, Value>,
        approvals: BTreeMap<String, bool>,
    ) -> Self {
        Self {
            phase: String::new(),
            ctx,
            artifacts: BTreeMap::new(),
            approvals,
            last_event: None,
        }
    }

    /// Pretty-JSON serialization of the state, truncated to at most `limit`
    /// characters (on a char boundary) for inclusion in prompts.
    pub fn snapshot(&self, limit: usize) -> String {
        let full = serde_json::to_string_pretty(self)
            .expect("RunState serializes to JSON");
        match full.char_indices().nth(limit) {
            Some((byte_idx, _)) => full[..byte_idx].to_string(),
            None => full,
        }
    }
}
