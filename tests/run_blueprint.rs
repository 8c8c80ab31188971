//! End-to-end blueprint runs in offline mode.
//!
//! These exercise the full stack — loader, graph compiler, runner, prompt
//! executor (offline), tool dispatcher — without any network access.

use std::collections::BTreeMap;

use pilot::artifacts::ArtifactStore;
use pilot::blueprint::Blueprint;
use pilot::executor::PromptExecutor;
use pilot::prompts::PromptLibrary;
use pilot::runner::Runner;
use pilot::state::Event;
use pilot::tools::ToolDispatcher;
use tempfile::TempDir;

fn offline_runner(dir: &TempDir, max_steps: u32) -> Runner {
    let store = ArtifactStore::new(dir.path().join("run_artifacts"));
    Runner::new(
        PromptExecutor::offline("gpt-4o-mini"),
        ToolDispatcher::new(store.clone()),
        store,
        max_steps,
    )
}

fn prompts() -> PromptLibrary {
    PromptLibrary::from_yaml(
        "designer: Draft the wireframes.\nengineer: Build the site.\noperator: Ship it.\n",
    )
    .unwrap()
}

const THREE_PHASE: &str = r#"
project:
  id: website-redesign
  goal: Ship the new marketing site
  context:
    stack: nextjs
phases:
  - id: design
    entry_prompt: designer
    transitions: {on_complete: build}
  - id: build
    entry_prompt: engineer
    gate: {type: automated_checks}
    transitions: {on_pass: ship}
  - id: ship
    entry_prompt: operator
    transitions: {on_complete: done}
"#;

#[tokio::test]
async fn three_phase_run_visits_every_phase_and_produces_three_artifacts() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 100);
    let bp = Blueprint::from_yaml(THREE_PHASE).unwrap();

    let state = runner.run(&bp, &prompts(), None).await.unwrap();

    let keys: Vec<&String> = state.artifacts.keys().collect();
    assert_eq!(keys, vec!["build", "design", "ship"]); // BTreeMap order
    assert_eq!(state.phase, "ship");
    assert_eq!(state.last_event, Some(Event::Complete));
    assert_eq!(state.ctx["project_id"], "website-redesign");
    assert_eq!(state.ctx["stack"], "nextjs");
    assert_eq!(state.approvals.get("PM"), Some(&true));

    // Each artifact came from that phase's own prompt execution.
    for (phase, path) in &state.artifacts {
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains(&format!("phase={}", phase)), "{}", content);
    }
}

#[tokio::test]
async fn tool_calls_run_in_declaration_order_and_unknown_tools_are_skipped() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 100);
    let bp = Blueprint::from_yaml(
        r#"
project: {id: p, goal: g}
phases:
  - id: design
    entry_prompt: designer
    tasks:
      - id: docs
        tool_calls:
          - "doc.create:brief.md"
          - "nonexistent.tool:x=1"
          - "ci.run_tests"
"#,
    )
    .unwrap();

    let state = runner.run(&bp, &prompts(), None).await.unwrap();

    let written: Vec<String> = std::fs::read_dir(dir.path().join("run_artifacts"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    // The phase artifact plus the doc.create side effect; the unknown tool
    // was skipped without failing the run.
    assert!(written.iter().any(|n| n.ends_with("-design.md")));
    assert!(written.iter().any(|n| n.ends_with("-brief.md")));
    assert_eq!(state.last_event, Some(Event::Complete));
}

// The inherited routing rule: when a gate emits an event the transition map
// does not handle, the run falls back to the first-declared target rather
// than erroring. Flagged here deliberately.
#[tokio::test]
async fn rejected_gate_with_no_matching_key_falls_back_to_first_declared_target() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 100);
    let bp = Blueprint::from_yaml(
        r#"
project: {id: p, goal: g}
phases:
  - id: review
    entry_prompt: designer
    gate: {type: human_approval, approver: PM}
    transitions:
      on_approved: polish
  - id: polish
    entry_prompt: engineer
"#,
    )
    .unwrap();
    let approvals = BTreeMap::from([("PM".to_string(), false)]);

    let state = runner.run(&bp, &prompts(), Some(approvals)).await.unwrap();

    // review emitted `rejected`; the only declared target is polish.
    assert!(state.artifacts.contains_key("polish"));
    assert_eq!(state.phase, "polish");
    assert_eq!(state.last_event, Some(Event::Complete));
}

#[tokio::test]
async fn rejected_gate_routing_to_terminal_alias_ends_the_run() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 100);
    let bp = Blueprint::from_yaml(
        r#"
project: {id: p, goal: g}
phases:
  - id: review
    entry_prompt: designer
    gate: {type: human_approval}
    transitions: {on_complete: done}
"#,
    )
    .unwrap();
    let approvals = BTreeMap::from([("PM".to_string(), false)]);

    let state = runner.run(&bp, &prompts(), Some(approvals)).await.unwrap();

    assert_eq!(state.last_event, Some(Event::Rejected));
    assert_eq!(state.artifacts.len(), 1);
}

#[tokio::test]
async fn unintended_cycle_hits_the_step_limit() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 5);
    let bp = Blueprint::from_yaml(
        r#"
project: {id: p, goal: g}
phases:
  - id: a
    entry_prompt: designer
    transitions: {on_complete: b}
  - id: b
    entry_prompt: engineer
    transitions: {on_complete: a}
"#,
    )
    .unwrap();

    let err = runner.run(&bp, &prompts(), None).await.unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("step limit of 5"), "{}", msg);
}

#[tokio::test]
async fn phase_with_unmapped_entry_prompt_produces_no_artifact() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 100);
    let bp = Blueprint::from_yaml(
        r#"
project: {id: p, goal: g}
phases:
  - id: silent
    entry_prompt: no_such_prompt
"#,
    )
    .unwrap();

    let state = runner.run(&bp, &prompts(), None).await.unwrap();

    assert!(state.artifacts.is_empty());
    assert_eq!(state.last_event, Some(Event::Complete));
}

#[tokio::test]
async fn transition_to_unknown_phase_fails_before_any_phase_executes() {
    let dir = TempDir::new().unwrap();
    let runner = offline_runner(&dir, 100);
    let bp = Blueprint::from_yaml(
        r#"
project: {id: p, goal: g}
phases:
  - id: a
    entry_prompt: designer
    transitions: {on_complete: nowhere}
"#,
    )
    .unwrap();

    let err = runner.run(&bp, &prompts(), None).await.unwrap_err();
    assert!(err.to_string().contains("unknown phase 'nowhere'"));
    // Compilation failed before execution: no artifacts were written.
    assert!(!dir.path().join("run_artifacts").exists());
}
