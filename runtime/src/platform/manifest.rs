//! JSONL download manifest, one appended line per saved course page.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE: &str = "manifest.jsonl";

/// A single saved course page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadRecord {
    pub downloaded_at: String,
    pub address: String,
    pub final_url: String,
    pub file: String,
    pub bytes: u64,
}

impl DownloadRecord {
    pub fn now(address: &str, final_url: &str, file: &Path, bytes: u64) -> Self {
        Self {
            downloaded_at: Utc::now().to_rfc3339(),
            address: address.to_string(),
            final_url: final_url.to_string(),
            file: file.display().to_string(),
            bytes,
        }
    }
}

/// Append-only manifest file.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
}

impl Manifest {
    /// Manifest living in `output_dir`. The file is created on first append.
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            path: output_dir.join(MANIFEST_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &DownloadRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open manifest: {}", self.path.display()))?;
        let json = serde_json::to_string(record)?;
        writeln!(file, "{json}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }

    /// Every record written so far, oldest first.
    pub fn read_all(&self) -> Result<Vec<DownloadRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        raw.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).context("corrupt manifest line"))
            .collect()
    }
}
