//! GitHub REST client used by remote-mode statistics.
//!
//! Read-only: lists a user's repositories and the commits they authored.
//! The [`HostingApi`] trait lets the stats scan run against scripted data in
//! tests.

use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::io::config::{Configuration, Credentials};

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const USERNAME_ENV: &str = "GITHUB_USERNAME";
const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "autocommit";
const PER_PAGE: &str = "100";

/// Read access to a code hosting service.
pub trait HostingApi {
    /// Names of the repositories owned by `username`.
    fn list_repositories(&self, username: &str) -> Result<Vec<String>>;

    /// Author dates of the commits `username` made to `repo` since `since`.
    ///
    /// An error body from the service counts as zero commits, not a failure.
    fn list_commit_dates(
        &self,
        username: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<NaiveDate>>;
}

/// Blocking GitHub API client.
pub struct GitHubClient {
    agent: ureq::Agent,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    /// Client for a GitHub Enterprise (or test) endpoint.
    pub fn with_api_url(api_url: impl Into<String>, token: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(30))
            .build();
        Self {
            agent,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str) -> ureq::Request {
        self.agent
            .get(&format!("{}{path}", self.api_url))
            .set("Authorization", &format!("token {}", self.token))
            .set("Accept", ACCEPT)
            .set("User-Agent", USER_AGENT)
    }
}

impl HostingApi for GitHubClient {
    #[instrument(skip_all, fields(username))]
    fn list_repositories(&self, username: &str) -> Result<Vec<String>> {
        let body = match self
            .get(&format!("/users/{username}/repos"))
            .query("per_page", PER_PAGE)
            .call()
        {
            Ok(resp) => resp.into_json::<Value>()?,
            Err(ureq::Error::Status(code, resp)) => {
                let detail = resp
                    .into_json::<Value>()
                    .ok()
                    .as_ref()
                    .and_then(api_message)
                    .unwrap_or_default();
                return Err(anyhow!("listing repositories failed ({code}): {detail}"));
            }
            Err(err) => return Err(anyhow!("listing repositories failed: {err}")),
        };
        let names = parse_repository_names(&body)?;
        debug!(count = names.len(), "repositories listed");
        Ok(names)
    }

    #[instrument(skip_all, fields(username, repo))]
    fn list_commit_dates(
        &self,
        username: &str,
        repo: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<NaiveDate>> {
        let since = since.to_rfc3339_opts(SecondsFormat::Secs, true);
        let body = match self
            .get(&format!("/repos/{username}/{repo}/commits"))
            .query("author", username)
            .query("since", &since)
            .query("per_page", PER_PAGE)
            .call()
        {
            Ok(resp) => resp.into_json::<Value>()?,
            Err(ureq::Error::Status(code, resp)) => {
                return commit_dates_from_error_status(code, resp.into_json::<Value>());
            }
            Err(err) => return Err(anyhow!("commit listing failed: {err}")),
        };
        Ok(parse_commit_dates(&body))
    }
}

/// Credentials for remote stats: config first, then `GITHUB_USERNAME` / `GITHUB_TOKEN`.
pub fn resolve_credentials(cfg: &Configuration) -> Option<Credentials> {
    resolve_credentials_with(cfg, |key| std::env::var(key).ok())
}

fn resolve_credentials_with(
    cfg: &Configuration,
    env: impl Fn(&str) -> Option<String>,
) -> Option<Credentials> {
    let pick = |configured: &str, key: &str| {
        let configured = configured.trim();
        if !configured.is_empty() {
            return Some(configured.to_string());
        }
        env(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };
    Some(Credentials {
        username: pick(&cfg.github_username, USERNAME_ENV)?,
        token: pick(&cfg.github_token, TOKEN_ENV)?,
    })
}

fn api_message(body: &Value) -> Option<String> {
    body.get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Commit dates for a non-success commit listing response.
///
/// GitHub answers 409 for empty repositories. Any JSON error body counts as
/// zero commits; a body that is not JSON fails the repository.
pub fn commit_dates_from_error_status(
    code: u16,
    body: std::io::Result<Value>,
) -> Result<Vec<NaiveDate>> {
    match body {
        Ok(body) => {
            warn!(code, message = ?api_message(&body), "commit listing returned an error body");
            Ok(parse_commit_dates(&body))
        }
        Err(err) => Err(anyhow!("commit listing failed ({code}): {err}")),
    }
}

/// Repository names from a `/users/{user}/repos` body.
pub fn parse_repository_names(body: &Value) -> Result<Vec<String>> {
    let Some(items) = body.as_array() else {
        let detail = api_message(body).unwrap_or_else(|| body.to_string());
        return Err(anyhow!("unexpected repository listing: {detail}"));
    };
    Ok(items
        .iter()
        .filter_map(|item| item.get("name").and_then(Value::as_str))
        .map(str::to_string)
        .collect())
}

/// Author dates from a `/repos/{owner}/{repo}/commits` body.
///
/// Non-list bodies yield no dates; entries without a parsable date are skipped.
pub fn parse_commit_dates(body: &Value) -> Vec<NaiveDate> {
    let Some(items) = body.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| item.pointer("/commit/author/date").and_then(Value::as_str))
        .filter_map(|date| date.get(..10))
        .filter_map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .collect()
}
