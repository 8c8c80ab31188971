//! Blueprint definition and YAML loading.
//!
//! A blueprint describes a project as an ordered list of phases, each with an
//! entry prompt, tasks (tool-call specs), an optional gate, and a transition
//! map routing the phase's outcome event to the next phase.
//!
//! Loading is two-stage: the raw YAML value is walked first, collecting every
//! structural violation into one `SchemaError`, and only a clean document is
//! decoded into the typed model. Unknown extra keys are ignored.

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::errors::SchemaError;

/// Gate kinds are a closed set; anything else is a schema violation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    HumanApproval,
    AutomatedChecks,
}

/// Per-phase decision descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Gate {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<GateKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approver: Option<String>,
    #[serde(default)]
    pub tools: Vec<String>,
}

/// A named group of tool-call specification strings, owned by one phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub tool_calls: Vec<String>,
}

/// One node of the execution graph.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    pub id: String,
    pub entry_prompt: String,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<Gate>,
    /// Event-key → target-phase-id (or a terminal alias). Insertion order is
    /// preserved; the first-declared target is the deterministic default
    /// route for events the map does not handle.
    #[serde(default)]
    pub transitions: IndexMap<String, String>,
}

/// Project identity plus a free-form context mapping carried into run state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Project {
    pub id: String,
    pub goal: String,
    #[serde(default)]
    pub context: serde_json::Map<String, Value>,
}

/// The full declarative blueprint. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Blueprint {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: Project,
    pub phases: Vec<Phase>,
}

fn default_version() -> u32 {
    1
}

impl Blueprint {
    /// Load a blueprint from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read blueprint file: {}", path.display()))?;
        Ok(Self::from_yaml(&content)?)
    }

    /// Parse a blueprint from YAML source, collecting every structural
    /// violation before failing.
    pub fn from_yaml(source: &str) -> Result<Self, SchemaError> {
        let value: serde_yaml::Value = serde_yaml::from_str(source)
            .map_err(|e| SchemaError::new(vec![format!("invalid YAML: {}", e)]))?;

        let mut violations = Vec::new();
        validate_blueprint(&value, &mut violations);
        if !violations.is_empty() {
            return Err(SchemaError::new(violations));
        }

        serde_yaml::from_value(value)
            .map_err(|e| SchemaError::new(vec![format!("blueprint decode failed: {}", e)]))
    }

    /// Look up a phase by id.
    pub fn phase(&self, id: &str) -> Option<&Phase> {
        self.phases.iter().find(|p| p.id == id)
    }
}

fn validate_blueprint(value: &serde_yaml::Value, out: &mut Vec<String>) {
    let Some(root) = value.as_mapping() else {
        out.push("blueprint: expected a mapping at the top level".into());
        return;
    };

    if let Some(version) = get(root, "version") {
        if !version.is_u64() {
            out.push(format!("version: expected integer, found {}", kind_of(version)));
        }
    }

    match get(root, "project") {
        None => out.push("project: required field is missing".into()),
        Some(project) => validate_project(project, out),
    }

    match get(root, "phases") {
        None => out.push("phases: required field is missing".into()),
        Some(phases) => validate_phases(phases, out),
    }
}

fn validate_project(value: &serde_yaml::Value, out: &mut Vec<String>) {
    let Some(project) = value.as_mapping() else {
        out.push(format!("project: expected mapping, found {}", kind_of(value)));
        return;
    };
    require_string(project, "project", "id", out);
    require_string(project, "project", "goal", out);
    if let Some(context) = get(project, "context") {
        if !context.is_mapping() {
            out.push(format!(
                "project.context: expected mapping, found {}",
                kind_of(context)
            ));
        }
    }
}

fn validate_phases(value: &serde_yaml::Value, out: &mut Vec<String>) {
    let Some(phases) = value.as_sequence() else {
        out.push(format!("phases: expected sequence, found {}", kind_of(value)));
        return;
    };
    if phases.is_empty() {
        out.push("phases: at least one phase is required".into());
        return;
    }

    let mut seen_ids = Vec::new();
    for (i, phase) in phases.iter().enumerate() {
        let at = format!("phases[{}]", i);
        let Some(map) = phase.as_mapping() else {
            out.push(format!("{}: expected mapping, found {}", at, kind_of(phase)));
            continue;
        };

        require_string(map, &at, "id", out);
        require_string(map, &at, "entry_prompt", out);

        if let Some(id) = get(map, "id").and_then(|v| v.as_str()) {
            if seen_ids.contains(&id) {
                out.push(format!("{}.id: duplicate phase id '{}'", at, id));
            }
            seen_ids.push(id);
        }

        if let Some(outputs) = get(map, "outputs") {
            check_string_seq(outputs, &format!("{}.outputs", at), out);
        }
        if let Some(tasks) = get(map, "tasks") {
            validate_tasks(tasks, &at, out);
        }
        if let Some(gate) = get(map, "gate") {
            validate_gate(gate, &at, out);
        }
        if let Some(transitions) = get(map, "transitions") {
            validate_transitions(transitions, &at, out);
        }
    }
}

fn validate_tasks(value: &serde_yaml::Value, at: &str, out: &mut Vec<String>) {
    let Some(tasks) = value.as_sequence() else {
        out.push(format!("{}.tasks: expected sequence, found {}", at, kind_of(value)));
        return;
    };
    for (i, task) in tasks.iter().enumerate() {
        let at = format!("{}.tasks[{}]", at, i);
        let Some(map) = task.as_mapping() else {
            out.push(format!("{}: expected mapping, found {}", at, kind_of(task)));
            continue;
        };
        require_string(map, &at, "id", out);
        if let Some(calls) = get(map, "tool_calls") {
            check_string_seq(calls, &format!("{}.tool_calls", at), out);
        }
    }
}

fn validate_gate(value: &serde_yaml::Value, at: &str, out: &mut Vec<String>) {
    let Some(gate) = value.as_mapping() else {
        out.push(format!("{}.gate: expected mapping, found {}", at, kind_of(value)));
        return;
    };
    if let Some(kind) = get(gate, "type") {
        match kind.as_str() {
            Some("human_approval") | Some("automated_checks") => {}
            Some(other) => out.push(format!(
                "{}.gate.type: unknown gate type '{}' (expected human_approval or automated_checks)",
                at, other
            )),
            None => out.push(format!("{}.gate.type: expected string, found {}", at, kind_of(kind))),
        }
    }
    if let Some(approver) = get(gate, "approver") {
        if !approver.is_string() {
            out.push(format!(
                "{}.gate.approver: expected string, found {}",
                at,
                kind_of(approver)
            ));
        }
    }
    if let Some(tools) = get(gate, "tools") {
        check_string_seq(tools, &format!("{}.gate.tools", at), out);
    }
}

fn validate_transitions(value: &serde_yaml::Value, at: &str, out: &mut Vec<String>) {
    let Some(map) = value.as_mapping() else {
        out.push(format!(
            "{}.transitions: expected mapping, found {}",
            at,
            kind_of(value)
        ));
        return;
    };
    for (key, target) in map {
        if !key.is_string() {
            out.push(format!(
                "{}.transitions: expected string key, found {}",
                at,
                kind_of(key)
            ));
        }
        if !target.is_string() {
            out.push(format!(
                "{}.transitions.{}: expected string target, found {}",
                at,
                key.as_str().unwrap_or("?"),
                kind_of(target)
            ));
        }
    }
}

fn get<'a>(map: &'a serde_yaml::Mapping, key: &str) -> Option<&'a serde_yaml::Value> {
    map.get(key)
}

fn require_string(map: &serde_yaml::Mapping, at: &str, key: &str, out: &mut Vec<String>) {
    match get(map, key) {
        None => out.push(format!("{}.{}: required field is missing", at, key)),
        Some(v) if !v.is_string() => out.push(format!(
            "{}.{}: expected string, found {}",
            at,
            key,
            kind_of(v)
        )),
        _ => {}
    }
}

fn check_string_seq(value: &serde_yaml::Value, at: &str, out: &mut Vec<String>) {
    let Some(seq) = value.as_sequence() else {
        out.push(format!("{}: expected sequence, found {}", at, kind_of(value)));
        return;
    };
    for (i, item) in seq.iter().enumerate() {
        if !item.is_string() {
            out.push(format!("{}[{}]: expected string, found {}", at, i, kind_of(item)));
        }
    }
}

fn kind_of(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "boolean",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
version: 1
project:
  id: website-redesign
  goal: Ship the new marketing site
  context:
    stack: nextjs
    budget_days: 14
phases:
  - id: design
    entry_prompt: designer
    outputs: [wireframes]
    tasks:
      - id: brief
        tool_calls: ["doc.create:design-brief.md"]
    transitions:
      on_complete: build
  - id: build
    entry_prompt: engineer
    gate:
      type: automated_checks
    transitions:
      on_pass: ship
  - id: ship
    entry_prompt: operator
    gate:
      type: human_approval
      approver: PM
    transitions:
      on_approved: done
"#;

    #[test]
    fn parses_valid_blueprint() {
        let bp = Blueprint::from_yaml(VALID).unwrap();
        assert_eq!(bp.version, 1);
        assert_eq!(bp.project.id, "website-redesign");
        assert_eq!(bp.phases.len(), 3);
        assert_eq!(bp.phases[0].tasks[0].tool_calls.len(), 1);
        assert_eq!(
            bp.phases[2].gate.as_ref().unwrap().kind,
            Some(GateKind::HumanApproval)
        );
        assert_eq!(bp.phases[1].transitions.get("on_pass").unwrap(), "ship");
    }

    #[test]
    fn version_defaults_to_one() {
        let bp = Blueprint::from_yaml(
            "project: {id: p, goal: g}\nphases: [{id: a, entry_prompt: x}]",
        )
        .unwrap();
        assert_eq!(bp.version, 1);
    }

    #[test]
    fn collects_every_violation_not_just_the_first() {
        let src = r#"
version: nope
project:
  goal: 7
phases: []
"#;
        let err = Blueprint::from_yaml(src).unwrap_err();
        assert!(err.violations.len() >= 4, "got: {:?}", err.violations);
        assert!(err.violations.iter().any(|v| v.starts_with("version:")));
        assert!(err.violations.iter().any(|v| v.contains("project.id")));
        assert!(err.violations.iter().any(|v| v.contains("project.goal")));
        assert!(err.violations.iter().any(|v| v.contains("phases:")));
    }

    #[test]
    fn duplicate_phase_ids_are_a_violation() {
        let src = r#"
project: {id: p, goal: g}
phases:
  - {id: a, entry_prompt: x}
  - {id: a, entry_prompt: y}
"#;
        let err = Blueprint::from_yaml(src).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("duplicate phase id 'a'")));
    }

    #[test]
    fn unknown_gate_type_is_a_violation() {
        let src = r#"
project: {id: p, goal: g}
phases:
  - id: a
    entry_prompt: x
    gate: {type: committee_vote}
"#;
        let err = Blueprint::from_yaml(src).unwrap_err();
        assert!(err.violations.iter().any(|v| v.contains("committee_vote")));
    }

    #[test]
    fn unknown_extra_keys_are_ignored() {
        let src = r#"
project: {id: p, goal: g, sponsor: alice}
phases:
  - {id: a, entry_prompt: x, color: blue}
extra_top_level: true
"#;
        assert!(Blueprint::from_yaml(src).is_ok());
    }

    #[test]
    fn round_trip_preserves_order_transitions_and_gates() {
        let bp = Blueprint::from_yaml(VALID).unwrap();
        let yaml = serde_yaml::to_string(&bp).unwrap();
        let again = Blueprint::from_yaml(&yaml).unwrap();
        assert_eq!(bp, again);
        let ids: Vec<&str> = again.phases.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["design", "build", "ship"]);
    }

    #[test]
    fn transition_map_preserves_declaration_order() {
        let src = r#"
project: {id: p, goal: g}
phases:
  - id: a
    entry_prompt: x
    transitions:
      on_pass: c
      on_complete: b
  - {id: b, entry_prompt: x}
  - {id: c, entry_prompt: x}
"#;
        let bp = Blueprint::from_yaml(src).unwrap();
        let keys: Vec<&String> = bp.phases[0].transitions.keys().collect();
        assert_eq!(keys, vec!["on_pass", "on_complete"]);
    }
}
