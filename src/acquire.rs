use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::{debug, warn};

use crate::domain::{ArchiveSource, PdbId};
use crate::error::KiraError;
use crate::rcsb::{RcsbClient, Remote};
use crate::store::Store;

pub struct AcquisitionManager<'a, R: RcsbClient + ?Sized> {
    client: &'a R,
    store: &'a Store,
    retry_budget: usize,
    retry_delay: Duration,
}

impl<'a, R: RcsbClient + ?Sized> AcquisitionManager<'a, R> {
    pub fn new(client: &'a R, store: &'a Store, retry_budget: usize, retry_delay: Duration) -> Self {
        Self {
            client,
            store,
            retry_budget,
            retry_delay,
        }
    }

    pub fn acquire(&self, id: &PdbId) -> Result<bool, KiraError> {
        Ok(self.acquire_path(id)?.is_some())
    }

    pub fn acquire_path(&self, id: &PdbId) -> Result<Option<Utf8PathBuf>, KiraError> {
        if let Some(existing) = self.store.find_downloaded(id) {
            return Ok(Some(existing));
        }

        for attempt in 1..=self.retry_budget {
            match self.try_chain(id) {
                Ok(Some(fetched)) => return self.store_archive(id, fetched).map(Some),
                Ok(None) => {
                    warn!(%id, "no archive endpoint has this entry");
                    return Ok(None);
                }
                Err(err) => {
                    warn!(%id, attempt, budget = self.retry_budget, "download attempt failed: {err}");
                    if attempt < self.retry_budget {
                        thread::sleep(self.retry_delay);
                    }
                }
            }
        }
        warn!(%id, "retry budget exhausted");
        Ok(None)
    }

    fn try_chain(&self, id: &PdbId) -> Result<Option<Fetched>, KiraError> {
        for source in ArchiveSource::PRIORITY {
            match self.client.fetch_archive(id, source)? {
                Remote::Found(bytes) => return Ok(Some(Fetched { source, bytes })),
                Remote::NotFound => debug!(%id, %source, "not available, falling through"),
                Remote::ServerError { status } => {
                    debug!(%id, %source, status, "endpoint error, falling through")
                }
            }
        }
        Ok(None)
    }

    fn store_archive(&self, id: &PdbId, fetched: Fetched) -> Result<Utf8PathBuf, KiraError> {
        let path = self.store.downloaded_path(id, fetched.source);
        Store::write_bytes_atomic(&path, &fetched.bytes)?;
        debug!(%id, source = %fetched.source, "archive stored at {path}");
        Ok(path)
    }
}

struct Fetched {
    source: ArchiveSource,
    bytes: Vec<u8>,
}
