use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum KiraError {
    #[error("invalid PDB id: {0}")]
    InvalidPdbId(String),

    #[error("unrecognized input: {0}")]
    InvalidInput(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("RCSB request failed: {0}")]
    RcsbHttp(String),

    #[error("RCSB returned status {status}: {message}")]
    RcsbStatus { status: u16, message: String },

    #[error("RCSB metadata for {id} kept failing after {attempts} attempts")]
    #[diagnostic(help("the archive looks unavailable; retry the batch later"))]
    RcsbOutage { id: String, attempts: usize },

    #[error("malformed RCSB payload: {0}")]
    RcsbMalformed(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to parse structure {path}: {message}")]
    StructureParse { path: String, message: String },

    #[error("failed to start worker pool: {0}")]
    WorkerPool(String),

    #[error("corrupt cached metric record {path}: {message}")]
    #[diagnostic(help("delete the file to recompute the metric"))]
    CorruptCache { path: String, message: String },
}

impl KiraError {
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            KiraError::RcsbOutage { .. } | KiraError::Filesystem(_) | KiraError::CorruptCache { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(
            KiraError::RcsbOutage {
                id: "1abc".to_string(),
                attempts: 10
            }
            .is_batch_fatal()
        );
        assert!(KiraError::Filesystem("read-only".to_string()).is_batch_fatal());
        assert!(!KiraError::RcsbHttp("connection reset".to_string()).is_batch_fatal());
        assert!(
            !KiraError::StructureParse {
                path: "x.pdb".to_string(),
                message: "bad".to_string()
            }
            .is_batch_fatal()
        );
    }
}
