//! GitHub REST client scoped to one owner/repository pair.
//!
//! Covers the endpoints the source-control tools need: issues, branch refs,
//! repository contents, and pull requests. Every call is bearer-token
//! authenticated; non-2xx responses surface as `ToolError::ExternalService`
//! with the service's error body preserved.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::{json, Value};

use crate::errors::{ConfigError, ToolError};

const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = "pilot";

pub struct GitHub {
    client: reqwest::Client,
    api_base: String,
    token: String,
    owner: String,
    repo: String,
}

/// Resolve the three required credentials, naming whichever are missing.
fn resolve_credentials(
    token: Option<String>,
    owner: Option<String>,
    repo: Option<String>,
) -> Result<(String, String, String), ConfigError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ConfigError("GITHUB_TOKEN is required for github.* tools".into()))?;
    match (
        owner.filter(|o| !o.is_empty()),
        repo.filter(|r| !r.is_empty()),
    ) {
        (Some(owner), Some(repo)) => Ok((token, owner, repo)),
        _ => Err(ConfigError(
            "GITHUB_OWNER and GITHUB_REPO are required for github.* tools".into(),
        )),
    }
}

impl GitHub {
    pub fn new(token: impl Into<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            token: token.into(),
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Build the client from `GITHUB_TOKEN`, `GITHUB_OWNER`, `GITHUB_REPO`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let (token, owner, repo) = resolve_credentials(
            std::env::var("GITHUB_TOKEN").ok(),
            std::env::var("GITHUB_OWNER").ok(),
            std::env::var("GITHUB_REPO").ok(),
        )?;
        Ok(Self::new(token, owner, repo))
    }

    /// Point at a different API host (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_base.trim_end_matches('/'),
            self.owner,
            self.repo,
            path
        )
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    pub async fn get_default_branch(&self) -> Result<String, ToolError> {
        let resp = self
            .request(reqwest::Method::GET, self.repo_url(""))
            .send()
            .await
            .map_err(transport)?;
        let body: Value = expect_success(resp).await?.json().await.map_err(transport)?;
        Ok(body
            .get("default_branch")
            .and_then(Value::as_str)
            .unwrap_or("main")
            .to_string())
    }

    async fn get_branch_sha(&self, branch: &str) -> Result<String, ToolError> {
        let resp = self
            .request(
                reqwest::Method::GET,
                self.repo_url(&format!("/git/ref/heads/{}", branch)),
            )
            .send()
            .await
            .map_err(transport)?;
        let body: Value = expect_success(resp).await?.json().await.map_err(transport)?;
        body.pointer("/object/sha")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                ToolError::Other(anyhow::anyhow!(
                    "branch ref response for '{}' is missing object.sha",
                    branch
                ))
            })
    }

    /// Create a branch off `from` (the repository's default branch when
    /// unspecified). Recreating an existing branch is a no-op success.
    pub async fn create_branch(
        &self,
        new_branch: &str,
        from: Option<&str>,
    ) -> Result<Value, ToolError> {
        let from = match from {
            Some(branch) => branch.to_string(),
            None => self.get_default_branch().await?,
        };
        let sha = self.get_branch_sha(&from).await?;

        let resp = self
            .request(reqwest::Method::POST, self.repo_url("/git/refs"))
            .json(&json!({
                "ref": format!("refs/heads/{}", new_branch),
                "sha": sha,
            }))
            .send()
            .await
            .map_err(transport)?;

        if resp.status().as_u16() == 422 {
            let body = resp.text().await.map_err(transport)?;
            if body.contains("Reference already exists") {
                return Ok(json!({"message": "exists", "ref": new_branch}));
            }
            return Err(ToolError::ExternalService {
                service: "github",
                status: 422,
                body,
            });
        }
        expect_success(resp).await?.json().await.map_err(transport)
    }

    /// Create or update a file on a branch.
    ///
    /// When the file already exists at `path` on `branch`, its current
    /// content sha is included so the write counts as an update rather than
    /// a conflicting creation.
    pub async fn commit_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        branch: &str,
    ) -> Result<Value, ToolError> {
        let contents_url = self.repo_url(&format!("/contents/{}", path));

        let existing = self
            .request(reqwest::Method::GET, contents_url.clone())
            .query(&[("ref", branch)])
            .send()
            .await
            .map_err(transport)?;
        let sha = if existing.status().is_success() {
            existing
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("sha").and_then(Value::as_str).map(str::to_string))
        } else {
            None
        };

        let mut payload = json!({
            "message": message,
            "content": BASE64.encode(content.as_bytes()),
            "branch": branch,
        });
        if let Some(sha) = sha {
            payload["sha"] = json!(sha);
        }

        let resp = self
            .request(reqwest::Method::PUT, contents_url)
            .json(&payload)
            .send()
            .await
            .map_err(transport)?;
        expect_success(resp).await?.json().await.map_err(transport)
    }

    pub async fn create_issue(&self, title: &str, body: &str) -> Result<Value, ToolError> {
        let resp = self
            .request(reqwest::Method::POST, self.repo_url("/issues"))
            .json(&json!({"title": title, "body": body}))
            .send()
            .await
            .map_err(transport)?;
        expect_success(resp).await?.json().await.map_err(transport)
    }

    pub async fn create_pr(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<Value, ToolError> {
        let resp = self
            .request(reqwest::Method::POST, self.repo_url("/pulls"))
            .json(&json!({"title": title, "head": head, "base": base, "body": body}))
            .send()
            .await
            .map_err(transport)?;
        expect_success(resp).await?.json().await.map_err(transport)
    }
}

fn transport(source: reqwest::Error) -> ToolError {
    ToolError::Transport {
        service: "github",
        source,
    }
}

async fn expect_success(resp: reqwest::Response) -> Result<reqwest::Response, ToolError> {
    let status = resp.status();
    if status.is_success() {
        Ok(resp)
    } else {
        let body = resp.text().await.unwrap_or_default();
        Err(ToolError::ExternalService {
            service: "github",
            status: status.as_u16(),
            body,
        })
    }
}
