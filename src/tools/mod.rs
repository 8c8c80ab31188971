//! Tool-call parsing and dispatch.
//!
//! A tool-call specification string is `name` or `name:argString`, where
//! `argString` is `|`-separated `key=value` pairs or bare flag tokens.
//! Specs parse into the closed [`ToolCall`] set; a spec matching no variant
//! is logged and skipped rather than failing the run, since blueprints are
//! user-authored.

pub mod deploy;
pub mod github;
pub mod stubs;

use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::artifacts::ArtifactStore;
use crate::errors::{StateError, ToolError};
use crate::state::RunState;
use anyhow::Context;
use github::GitHub;

/// Parsed `|`-separated argument string.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ToolArgs {
    values: HashMap<String, String>,
    flags: Vec<String>,
}

impl ToolArgs {
    /// Parse `k1=v1|k2=v2|bare` into keyed values and bare flags.
    pub fn parse(raw: &str) -> Self {
        let mut args = ToolArgs::default();
        for token in raw.split('|').map(str::trim).filter(|t| !t.is_empty()) {
            match token.split_once('=') {
                Some((key, value)) => {
                    args.values.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => args.flags.push(token.to_string()),
            }
        }
        args
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Bare tokens act as boolean flags under their own name.
    pub fn flag(&self, name: &str) -> bool {
        self.flags.iter().any(|f| f == name)
    }
}

/// The closed set of recognized tool calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    DocCreate {
        name: String,
    },
    CiRunTests,
    LighthouseAudit,
    GithubCreateIssue {
        title: String,
        body: String,
    },
    GithubCreateBranch {
        name: String,
        from: Option<String>,
    },
    GithubCommitArtifact {
        phase: Option<String>,
        path: Option<String>,
        branch: String,
        message: Option<String>,
    },
    GithubOpenPr {
        title: String,
        head: String,
        base: String,
        body: String,
    },
    DeployVercel,
}

impl ToolCall {
    /// Parse a specification string. `None` means the name is unrecognized;
    /// the caller decides whether that skips or fails.
    pub fn parse(spec: &str) -> Option<Self> {
        let (name, raw_arg) = match spec.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (spec, None),
        };
        let args = ToolArgs::parse(raw_arg.unwrap_or(""));

        match name {
            "doc.create" => Some(ToolCall::DocCreate {
                name: raw_arg
                    .filter(|a| !a.is_empty())
                    .unwrap_or("note.md")
                    .to_string(),
            }),
            "ci.run_tests" => Some(ToolCall::CiRunTests),
            "lighthouse.audit" => Some(ToolCall::LighthouseAudit),
            "github.create_issue" => Some(ToolCall::GithubCreateIssue {
                title: args.get_or("title", "Task"),
                body: args.get_or("body", ""),
            }),
            "github.create_branch" => Some(ToolCall::GithubCreateBranch {
                name: args.get_or("name", "feature"),
                from: args.get("from").map(str::to_string),
            }),
            "github.commit_artifact" => Some(ToolCall::GithubCommitArtifact {
                phase: args.get("phase").map(str::to_string),
                path: args.get("path").map(str::to_string),
                branch: args.get_or("branch", "feature"),
                message: args.get("message").map(str::to_string),
            }),
            "github.open_pr" => Some(ToolCall::GithubOpenPr {
                title: args.get_or("title", "Automated PR"),
                head: args.get_or("head", "feature"),
                base: args.get_or("base", "main"),
                body: args.get_or("body", ""),
            }),
            "deploy.vercel" => Some(ToolCall::DeployVercel),
            _ => None,
        }
    }
}

/// Executes tool calls against their side-effecting targets.
pub struct ToolDispatcher {
    artifacts: ArtifactStore,
}

impl ToolDispatcher {
    pub fn new(artifacts: ArtifactStore) -> Self {
        Self { artifacts }
    }

    /// Dispatch one specification string.
    ///
    /// Unrecognized names are logged and return `Ok(None)`; recognized but
    /// misconfigured or failed calls return an error.
    pub async fn dispatch(
        &self,
        spec: &str,
        state: &RunState,
    ) -> Result<Option<Value>, ToolError> {
        let Some(call) = ToolCall::parse(spec) else {
            warn!(spec, "unknown tool; skipping");
            return Ok(None);
        };

        let result = match call {
            ToolCall::DocCreate { name } => stubs::doc_create(&self.artifacts, &name)?,
            ToolCall::CiRunTests => stubs::ci_run_tests(),
            ToolCall::LighthouseAudit => stubs::lighthouse_audit(),
            ToolCall::GithubCreateIssue { title, body } => {
                let gh = GitHub::from_env()?;
                gh.create_issue(&title, &body).await?
            }
            ToolCall::GithubCreateBranch { name, from } => {
                let gh = GitHub::from_env()?;
                gh.create_branch(&name, from.as_deref()).await?
            }
            ToolCall::GithubCommitArtifact {
                phase,
                path,
                branch,
                message,
            } => {
                // State checks come before credentials and the network:
                // a missing artifact must fail the same way regardless of
                // how the environment is configured.
                let phase = phase.ok_or_else(|| {
                    StateError("github.commit_artifact requires phase=<id>".into())
                })?;
                let artifact = state.artifacts.get(&phase).ok_or_else(|| {
                    StateError(format!(
                        "github.commit_artifact: no artifact recorded for phase '{}'",
                        phase
                    ))
                })?;
                let content = std::fs::read_to_string(artifact).with_context(|| {
                    format!("Failed to read artifact: {}", artifact.display())
                })?;

                let gh = GitHub::from_env()?;
                let path = path.unwrap_or_else(|| format!("{}.md", phase));
                let message = message.unwrap_or_else(|| format!("chore: add artifact {}", phase));
                gh.commit_file(&path, &content, &message, &branch).await?
            }
            ToolCall::GithubOpenPr {
                title,
                head,
                base,
                body,
            } => {
                let gh = GitHub::from_env()?;
                gh.create_pr(&title, &head, &base, &body).await?
            }
            ToolCall::DeployVercel => deploy::vercel_deploy().await?,
        };

        Ok(Some(result))
    }
}
