use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use tempfile::Builder;

use crate::domain::{ArchiveSource, MetricKind, PdbId};
use crate::error::KiraError;

#[derive(Debug, Clone)]
pub struct Store {
    root: Utf8PathBuf,
}

impl Store {
    pub fn new(data_dir: Option<&str>) -> Result<Self, KiraError> {
        if let Some(dir) = data_dir {
            return Ok(Self::new_with_root(Utf8PathBuf::from(dir)));
        }

        let root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.home_dir().join(".cache").join("kira-structure-curator"),
                )
                .ok()
            })
            .ok_or_else(|| {
                KiraError::Filesystem("unable to resolve data directory".to_string())
            })?;
        Ok(Self { root })
    }

    pub fn new_with_root(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn downloaded_dir(&self) -> Utf8PathBuf {
        self.root.join("downloaded")
    }

    pub fn prepared_dir(&self) -> Utf8PathBuf {
        self.root.join("prepared")
    }

    pub fn metrics_dir(&self) -> Utf8PathBuf {
        self.root.join("metrics")
    }

    pub fn downloaded_path(&self, id: &PdbId, source: ArchiveSource) -> Utf8PathBuf {
        self.downloaded_dir()
            .join(format!("{id}.{}", source.extension()))
    }

    pub fn find_downloaded(&self, id: &PdbId) -> Option<Utf8PathBuf> {
        ArchiveSource::PRIORITY
            .into_iter()
            .map(|source| self.downloaded_path(id, source))
            .find(|path| path.as_std_path().is_file())
    }

    pub fn prepared_path(&self, id: &PdbId) -> Utf8PathBuf {
        self.prepared_dir().join(format!("{id}.pdb"))
    }

    pub fn metric_path(&self, id: &PdbId, kind: MetricKind) -> Utf8PathBuf {
        self.metrics_dir().join(format!("{id}_{kind}.json"))
    }

    pub fn ensure_layout(&self) -> Result<(), KiraError> {
        for dir in [
            self.downloaded_dir(),
            self.prepared_dir(),
            self.metrics_dir(),
        ] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| KiraError::Filesystem(format!("create {dir}: {err}")))?;
        }
        Ok(())
    }

    /// Writes to a temp file beside `path` and renames it into place, so readers
    /// see either nothing or the complete content.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), KiraError> {
        let parent = path
            .parent()
            .ok_or_else(|| KiraError::Filesystem(format!("invalid destination path {path}")))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".kira-sc")
            .suffix(".tmp")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| KiraError::Filesystem(format!("persist {path}: {}", err.error)))?;
        Ok(())
    }
}
