//! Optional remote replication of snapshots.
//!
//! Each dataset keeps exactly one remote artifact. A replicate call uploads
//! `<stem>_autoPush.<ext>` and then deletes every other artifact whose name
//! maps to the same dataset key, whether it was an earlier auto-push or a
//! manual upload. Pruning is best-effort: failures are logged and reported
//! but never fail the call.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::RemoteConfig;
use crate::error::{Result, ReviewError};

pub const AUTO_PUSH_SUFFIX: &str = "_autoPush";
const GITHUB_API: &str = "https://api.github.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A file in the remote target directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    /// Revision token some stores need to overwrite or delete.
    pub sha: Option<String>,
}

/// Listing/upload/delete against one remote directory.
pub trait RemoteStore {
    fn list(&self) -> Result<Vec<RemoteEntry>>;
    fn upload(&self, name: &str, bytes: &[u8], existing: Option<&RemoteEntry>) -> Result<()>;
    fn delete(&self, entry: &RemoteEntry) -> Result<()>;
}

impl<T: RemoteStore + ?Sized> RemoteStore for Arc<T> {
    fn list(&self) -> Result<Vec<RemoteEntry>> {
        (**self).list()
    }

    fn upload(&self, name: &str, bytes: &[u8], existing: Option<&RemoteEntry>) -> Result<()> {
        (**self).upload(name, bytes, existing)
    }

    fn delete(&self, entry: &RemoteEntry) -> Result<()> {
        (**self).delete(entry)
    }
}

/// `tweets.csv` -> `tweets_autoPush.csv`. Names already carrying the suffix
/// are returned unchanged.
pub fn replica_name(base_name: &str) -> String {
    let path = Path::new(base_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = stem.strip_suffix(AUTO_PUSH_SUFFIX).unwrap_or(&stem);
    match path.extension() {
        Some(ext) => format!("{}{}.{}", stem, AUTO_PUSH_SUFFIX, ext.to_string_lossy()),
        None => format!("{}{}", stem, AUTO_PUSH_SUFFIX),
    }
}

/// Dataset a remote name belongs to: the stem without extension or
/// auto-push suffix, lower-cased.
pub fn dataset_key(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let suffix = AUTO_PUSH_SUFFIX.to_lowercase();
    stem.strip_suffix(&suffix).unwrap_or(&stem).to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub uploaded: String,
    pub pruned: Vec<String>,
    pub prune_failures: Vec<String>,
}

pub struct RemoteReplicator {
    store: Box<dyn RemoteStore>,
}

impl RemoteReplicator {
    pub fn new(store: Box<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn github(config: RemoteConfig) -> Self {
        Self::new(Box::new(GitHubStore::new(config)))
    }

    /// Upload `bytes` as the replica of `base_name`, then prune every other
    /// artifact of `dataset`. Only the upload can fail the call.
    pub fn replicate(
        &self,
        bytes: &[u8],
        base_name: &str,
        dataset: &str,
    ) -> Result<ReplicationReport> {
        let name = replica_name(base_name);
        let key = dataset_key(dataset);

        let existing = match self.store.list() {
            Ok(entries) => entries.into_iter().find(|e| e.name == name),
            Err(e) => {
                warn!("could not list remote before upload: {}", e);
                None
            }
        };
        self.store.upload(&name, bytes, existing.as_ref())?;
        info!("replicated {} ({} bytes)", name, bytes.len());

        let mut report = ReplicationReport {
            uploaded: name.clone(),
            ..Default::default()
        };

        let entries = match self.store.list() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("could not list remote for pruning: {}", e);
                report.prune_failures.push(format!("listing: {}", e));
                return Ok(report);
            }
        };
        for entry in entries
            .iter()
            .filter(|e| e.name != name && dataset_key(&e.name) == key)
        {
            match self.store.delete(entry) {
                Ok(()) => {
                    info!("pruned stale replica {}", entry.name);
                    report.pruned.push(entry.name.clone());
                }
                Err(e) => {
                    warn!("failed to prune {}: {}", entry.name, e);
                    report.prune_failures.push(entry.name.clone());
                }
            }
        }
        Ok(report)
    }
}

#[derive(Debug, Deserialize)]
struct ContentItem {
    name: String,
    sha: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Remote store backed by the GitHub contents API.
pub struct GitHubStore {
    agent: ureq::Agent,
    config: RemoteConfig,
    api_base: String,
}

impl GitHubStore {
    pub fn new(config: RemoteConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            config,
            api_base: GITHUB_API.to_string(),
        }
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    fn directory(&self) -> String {
        self.config
            .subdirectory
            .as_deref()
            .map(|d| d.trim_matches('/').to_string())
            .unwrap_or_default()
    }

    fn contents_url(&self, name: Option<&str>) -> String {
        let mut path = self.directory();
        if let Some(name) = name {
            if !path.is_empty() {
                path.push('/');
            }
            path.push_str(name);
        }
        let base = format!(
            "{}/repos/{}/{}/contents",
            self.api_base, self.config.owner, self.config.repo
        );
        if path.is_empty() {
            base
        } else {
            format!("{}/{}", base, encode_path(&path))
        }
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.config.token)
    }
}

impl RemoteStore for GitHubStore {
    fn list(&self) -> Result<Vec<RemoteEntry>> {
        let url = self.contents_url(None);
        let response = self
            .agent
            .get(&url)
            .query("ref", &self.config.branch)
            .header("Authorization", &self.auth())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "clipbook")
            .call();

        let response = match response {
            Ok(response) => response,
            // Directory not created yet.
            Err(ureq::Error::StatusCode(404)) => return Ok(Vec::new()),
            Err(e) => {
                return Err(ReviewError::Replication(format!(
                    "listing {}: {}",
                    url, e
                )))
            }
        };

        let body = response
            .into_body()
            .read_to_string()
            .map_err(|e| ReviewError::Replication(format!("reading listing: {}", e)))?;
        let items: Vec<ContentItem> = serde_json::from_str(&body)
            .map_err(|e| ReviewError::Replication(format!("parsing listing: {}", e)))?;

        Ok(items
            .into_iter()
            .filter(|item| item.kind == "file")
            .map(|item| RemoteEntry {
                name: item.name,
                sha: Some(item.sha),
            })
            .collect())
    }

    fn upload(&self, name: &str, bytes: &[u8], existing: Option<&RemoteEntry>) -> Result<()> {
        let url = self.contents_url(Some(name));
        let mut body = serde_json::json!({
            "message": format!("Auto-push {}", name),
            "content": general_purpose::STANDARD.encode(bytes),
            "branch": self.config.branch,
        });
        if let Some(sha) = existing.and_then(|e| e.sha.as_deref()) {
            body["sha"] = serde_json::Value::String(sha.to_string());
        }

        self.agent
            .put(&url)
            .header("Authorization", &self.auth())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "clipbook")
            .send_json(&body)
            .map_err(|e| ReviewError::Replication(format!("uploading {}: {}", name, e)))?;
        Ok(())
    }

    fn delete(&self, entry: &RemoteEntry) -> Result<()> {
        let sha = entry.sha.as_deref().ok_or_else(|| {
            ReviewError::Replication(format!("no revision known for {}", entry.name))
        })?;
        let url = self.contents_url(Some(&entry.name));
        let body = serde_json::json!({
            "message": format!("Remove stale copy {}", entry.name),
            "sha": sha,
            "branch": self.config.branch,
        });

        self.agent
            .delete(&url)
            .header("Authorization", &self.auth())
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "clipbook")
            .force_send_body()
            .send_json(&body)
            .map_err(|e| ReviewError::Replication(format!("deleting {}: {}", entry.name, e)))?;
        Ok(())
    }
}

/// Percent-encode each path segment, keeping `/` separators.
fn encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// In-process remote store, used for dry runs and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_uploads: bool,
    fail_deletes: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_uploads(mut self) -> Self {
        self.fail_uploads = true;
        self
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn insert(&self, name: &str, bytes: &[u8]) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(name.to_string(), bytes.to_vec());
        }
    }

    pub fn names(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.files
            .lock()
            .ok()
            .and_then(|files| files.get(name).cloned())
    }

    fn files(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.files
            .lock()
            .map_err(|_| ReviewError::Replication("memory store poisoned".to_string()))
    }
}

impl RemoteStore for MemoryStore {
    fn list(&self) -> Result<Vec<RemoteEntry>> {
        Ok(self
            .files()?
            .keys()
            .map(|name| RemoteEntry {
                name: name.clone(),
                sha: None,
            })
            .collect())
    }

    fn upload(&self, name: &str, bytes: &[u8], _existing: Option<&RemoteEntry>) -> Result<()> {
        if self.fail_uploads {
            return Err(ReviewError::Replication(format!(
                "uploading {}: remote unavailable",
                name
            )));
        }
        self.files()?.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&self, entry: &RemoteEntry) -> Result<()> {
        if self.fail_deletes {
            return Err(ReviewError::Replication(format!(
                "deleting {}: remote unavailable",
                entry.name
            )));
        }
        self.files()?.remove(&entry.name);
        Ok(())
    }
}
