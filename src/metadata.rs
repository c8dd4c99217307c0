use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::PdbId;
use crate::error::KiraError;
use crate::rcsb::{MetadataEndpoint, RcsbClient, Remote};
use crate::record::SizeMetrics;

pub struct MetadataService<'a, R: RcsbClient + ?Sized> {
    client: &'a R,
    retry_budget: usize,
    retry_delay: Duration,
}

impl<'a, R: RcsbClient + ?Sized> MetadataService<'a, R> {
    pub fn new(client: &'a R, retry_budget: usize, retry_delay: Duration) -> Self {
        Self {
            client,
            retry_budget,
            retry_delay,
        }
    }

    /// Assembly counts when available, deposited entry counts otherwise.
    ///
    /// When both endpoints report not-found the summary is all zeros rather than
    /// unknown. That can hide a failed lookup and is worth revisiting.
    pub fn size_summary(&self, id: &PdbId) -> Result<SizeMetrics, KiraError> {
        let mut last_connect = None;
        for attempt in 1..=self.retry_budget {
            match self.lookup(id) {
                Ok(Some(size)) => return Ok(size),
                Ok(None) => {
                    warn!(%id, "no assembly or entry metadata, recording zero size");
                    return Ok(SizeMetrics::default());
                }
                Err(Retry::Server(status)) => {
                    warn!(%id, attempt, status, "metadata server error");
                    last_connect = None;
                }
                Err(Retry::Connect(err)) => {
                    warn!(%id, attempt, "metadata request failed: {err}");
                    last_connect = Some(err);
                }
                Err(Retry::Fatal(err)) => return Err(err),
            }
            if attempt < self.retry_budget {
                thread::sleep(self.retry_delay);
            }
        }
        // Only a server that keeps answering with errors is an outage.
        match last_connect {
            Some(err) => Err(err),
            None => Err(KiraError::RcsbOutage {
                id: id.to_string(),
                attempts: self.retry_budget,
            }),
        }
    }

    fn lookup(&self, id: &PdbId) -> Result<Option<SizeMetrics>, Retry> {
        for endpoint in [MetadataEndpoint::Assembly, MetadataEndpoint::Entry] {
            let response = self
                .client
                .fetch_metadata(id, endpoint)
                .map_err(|err| match err {
                    KiraError::RcsbHttp(_) => Retry::Connect(err),
                    other => Retry::Fatal(other),
                })?;
            match response {
                Remote::Found(payload) => {
                    return size_from_payload(&payload, endpoint).map(Some).map_err(Retry::Fatal);
                }
                Remote::NotFound => debug!(%id, ?endpoint, "metadata not found"),
                Remote::ServerError { status } => return Err(Retry::Server(status)),
            }
        }
        Ok(None)
    }
}

enum Retry {
    Server(u16),
    Connect(KiraError),
    Fatal(KiraError),
}

pub fn size_from_payload(payload: &Value, endpoint: MetadataEndpoint) -> Result<SizeMetrics, KiraError> {
    let (section, atoms, residues, chains) = match endpoint {
        MetadataEndpoint::Assembly => (
            "rcsb_assembly_info",
            "atom_count",
            "polymer_monomer_count",
            "polymer_entity_instance_count",
        ),
        MetadataEndpoint::Entry => (
            "rcsb_entry_info",
            "deposited_atom_count",
            "deposited_polymer_monomer_count",
            "deposited_polymer_entity_instance_count",
        ),
    };
    let info = payload
        .get(section)
        .ok_or_else(|| KiraError::RcsbMalformed(format!("missing {section}")))?;
    let count = |field: &str| -> Result<u64, KiraError> {
        info.get(field)
            .and_then(|value| value.as_u64())
            .ok_or_else(|| KiraError::RcsbMalformed(format!("missing {section}.{field}")))
    };
    Ok(SizeMetrics {
        atoms: count(atoms)?,
        residues: count(residues)?,
        chains: count(chains)?,
    })
}
