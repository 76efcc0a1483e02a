//! On-disk job working directories
//!
//! ```text
//! <work_dir>/<job_id>/
//! ├── <scanner>/              # per-adapter scratch, raw output when kept
//! │   ├── output.stdout
//! │   └── output.stderr
//! └── final_results.json      # the report, when kept
//! ```

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::ScanReport;

pub const FINAL_RESULTS_FILE: &str = "final_results.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Artifact I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Layout and retention of job working directories.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    keep: bool,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, keep: bool) -> Self {
        Self {
            root: root.into(),
            keep,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn job_dir(&self, job_id: Uuid) -> PathBuf {
        self.root.join(job_id.to_string())
    }

    pub fn scanner_dir(&self, job_id: Uuid, scanner: &str) -> PathBuf {
        self.job_dir(job_id).join(scanner)
    }

    /// Write the report next to the raw outputs, or remove the job directory
    /// when artifacts are not kept. Returns the report path when written.
    pub async fn finalize(
        &self,
        job_id: Uuid,
        report: &ScanReport,
    ) -> Result<Option<PathBuf>, ArtifactError> {
        let dir = self.job_dir(job_id);
        if !self.keep {
            match tokio::fs::remove_dir_all(&dir).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(ArtifactError::Io { path: dir, source }),
            }
            return Ok(None);
        }

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| ArtifactError::Io {
                path: dir.clone(),
                source,
            })?;
        let path = dir.join(FINAL_RESULTS_FILE);
        let body = serde_json::to_vec_pretty(report)?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
        tracing::debug!(job_id = %job_id, path = %path.display(), "Final results written");
        Ok(Some(path))
    }
}
