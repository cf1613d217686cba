//! Persisted log of delivered identifiers
//!
//! Stored as `{"posted_ids": [...], "updated_at": "..."}`. Files written by
//! earlier tooling use the key `posted_urls`; both are accepted on read.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::sku::normalize_url;
use crate::infrastructure::csv_store::replace_file;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PostLogFile {
    #[serde(default, alias = "posted_urls")]
    posted_ids: Vec<String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// Append-only ordered set of identifiers already delivered
#[derive(Debug)]
pub struct PostLog {
    path: PathBuf,
    ids: Vec<String>,
    index: HashSet<String>,
}

impl PostLog {
    /// Load the log at `path`. A missing file is an empty log; an unreadable or
    /// corrupt one is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let file = match std::fs::read(path) {
            Ok(bytes) => serde_json::from_slice::<PostLogFile>(&bytes)
                .with_context(|| format!("Post log {} is corrupt", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No post log at {}, starting empty", path.display());
                PostLogFile::default()
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read post log {}", path.display())),
        };

        let mut log = Self {
            path: path.to_path_buf(),
            ids: Vec::with_capacity(file.posted_ids.len()),
            index: HashSet::with_capacity(file.posted_ids.len()),
        };
        for id in file.posted_ids {
            log.record(&canonical_id(&id));
        }

        debug!("Loaded post log with {} identifiers", log.len());
        Ok(log)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Append `id`; returns false when it was already present
    pub fn record(&mut self, id: &str) -> bool {
        if !self.index.insert(id.to_string()) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Persist atomically
    pub fn save(&self) -> Result<()> {
        let file = PostLogFile {
            posted_ids: self.ids.clone(),
            updated_at: Some(Utc::now()),
        };
        let json = serde_json::to_vec_pretty(&file).context("Failed to serialize post log")?;
        replace_file(&self.path, &json)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// URL entries from older files were stored un-normalized
fn canonical_id(id: &str) -> String {
    let id = id.trim();
    if id.starts_with("http://") || id.starts_with("https://") {
        normalize_url(id)
    } else {
        id.to_string()
    }
}
