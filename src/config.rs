use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::export::DEFAULT_HANDLE;

pub const DEFAULT_SAVE_INTERVAL: usize = 20;
pub const DEFAULT_EXPORT_PATH: &str = "Issue Clipbook.md";
pub const DEFAULT_BRANCH: &str = "main";

/// Remote replication target. Present only when a credential and a
/// repository are both configured.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    /// Directory inside the repository, if replicas should not live at the root.
    pub subdirectory: Option<String>,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("token", &"<redacted>")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("subdirectory", &self.subdirectory)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ReviewConfig {
    /// Account handle printed in every citation.
    pub handle: String,
    /// Decisions between automatic save cycles.
    pub save_interval: usize,
    pub export_path: PathBuf,
    pub remote: Option<RemoteConfig>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            handle: DEFAULT_HANDLE.to_string(),
            save_interval: DEFAULT_SAVE_INTERVAL,
            export_path: PathBuf::from(DEFAULT_EXPORT_PATH),
            remote: None,
        }
    }
}

impl ReviewConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| non_blank(lookup(key));

        let handle = get("CLIPBOOK_HANDLE")
            .map(|h| h.trim_start_matches('@').to_string())
            .unwrap_or_else(|| DEFAULT_HANDLE.to_string());

        let save_interval = match get("CLIPBOOK_SAVE_INTERVAL") {
            Some(value) => parse_save_interval(&value)
                .context("CLIPBOOK_SAVE_INTERVAL must be a positive number")?,
            None => DEFAULT_SAVE_INTERVAL,
        };

        let export_path = get("CLIPBOOK_EXPORT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_PATH));

        let remote = match (get("CLIPBOOK_GITHUB_TOKEN"), get("CLIPBOOK_REMOTE_REPO")) {
            (Some(token), Some(repo)) => {
                let (owner, repo) = parse_repo(&repo)
                    .context("CLIPBOOK_REMOTE_REPO must look like owner/name")?;
                Some(RemoteConfig {
                    token,
                    owner,
                    repo,
                    branch: get("CLIPBOOK_REMOTE_BRANCH")
                        .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                    subdirectory: get("CLIPBOOK_REMOTE_DIR"),
                })
            }
            _ => None,
        };

        Ok(Self {
            handle,
            save_interval,
            export_path,
            remote,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn parse_save_interval(value: &str) -> Result<usize> {
    let interval: usize = value
        .trim()
        .parse()
        .with_context(|| format!("not a number: {:?}", value))?;
    if interval == 0 {
        return Err(anyhow!("save interval must be at least 1"));
    }
    Ok(interval)
}

/// Split `owner/name`.
pub fn parse_repo(value: &str) -> Result<(String, String)> {
    let (owner, repo) = value
        .trim()
        .split_once('/')
        .ok_or_else(|| anyhow!("missing '/' in {:?}", value))?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return Err(anyhow!("invalid repository {:?}", value));
    }
    Ok((owner.to_string(), repo.to_string()))
}
