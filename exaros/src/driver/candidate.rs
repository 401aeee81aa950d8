//! Candidate configuration artifacts.

use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::{Result, TransferError};

/// Default file name of the staged candidate on the device.
pub const DEFAULT_CANDIDATE_NAME: &str = "candidate.conf";

/// Where a candidate's content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSource {
    /// An existing local file.
    File(PathBuf),

    /// In-memory configuration text, written to a temporary file for transfer.
    Text(String),
}

impl CandidateSource {
    /// Source from a local file.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        CandidateSource::File(path.into())
    }

    /// Source from configuration text.
    pub fn text(config: impl Into<String>) -> Self {
        CandidateSource::Text(config.into())
    }
}

/// The fixed staging location of the candidate on the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateConfig {
    /// File name of the staged candidate.
    pub name: String,

    /// Destination path for the transfer, also named by `load <kind> <path>`.
    pub remote_path: String,
}

impl CandidateConfig {
    /// Stage as `name`, inside `remote_dir` or the login directory.
    pub fn new(name: impl Into<String>, remote_dir: Option<&str>) -> Self {
        let name = name.into();
        let remote_path = match remote_dir.map(|d| d.trim_end_matches('/')) {
            Some("") => format!("/{name}"),
            Some(dir) => format!("{dir}/{name}"),
            None => name.clone(),
        };
        Self { name, remote_path }
    }
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CANDIDATE_NAME, None)
    }
}

/// A local file ready to be staged.
///
/// Text sources are backed by a temporary file that is removed when the
/// payload is released or dropped.
#[derive(Debug)]
pub(crate) struct LocalPayload {
    path: PathBuf,
    content: String,
    temp: Option<NamedTempFile>,
}

impl LocalPayload {
    /// Prepare `source` for transfer.
    pub(crate) async fn materialize(source: &CandidateSource) -> Result<Self> {
        match source {
            CandidateSource::File(path) => {
                let content = tokio::fs::read_to_string(path)
                    .await
                    .map_err(TransferError::Io)?;
                Ok(Self {
                    path: path.clone(),
                    content,
                    temp: None,
                })
            }
            CandidateSource::Text(text) => {
                let temp = tempfile::Builder::new()
                    .prefix("exaros-candidate-")
                    .suffix(".conf")
                    .tempfile()
                    .map_err(TransferError::Io)?;
                tokio::fs::write(temp.path(), text)
                    .await
                    .map_err(TransferError::Io)?;
                debug!("materialized candidate at {}", temp.path().display());
                Ok(Self {
                    path: temp.path().to_path_buf(),
                    content: text.clone(),
                    temp: Some(temp),
                })
            }
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Remove any temporary file and return the candidate text.
    pub(crate) fn release(self) -> String {
        if let Some(temp) = self.temp {
            let path = temp.path().to_path_buf();
            if let Err(e) = temp.close() {
                warn!("failed to remove {}: {}", path.display(), e);
            }
        }
        self.content
    }
}
