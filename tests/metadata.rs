use std::sync::Mutex;
use std::time::Duration;

use assert_matches::assert_matches;
use serde_json::{Value, json};

use kira_structure_curator::domain::{ArchiveSource, PdbId};
use kira_structure_curator::error::KiraError;
use kira_structure_curator::metadata::MetadataService;
use kira_structure_curator::rcsb::{MetadataEndpoint, RcsbClient, Remote};
use kira_structure_curator::record::SizeMetrics;

struct MetadataStub {
    assembly: Remote<Value>,
    entry: Remote<Value>,
    offline: bool,
    calls: Mutex<Vec<MetadataEndpoint>>,
}

impl MetadataStub {
    fn new(assembly: Remote<Value>, entry: Remote<Value>) -> Self {
        Self {
            assembly,
            entry,
            offline: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn offline() -> Self {
        Self {
            offline: true,
            ..Self::new(Remote::NotFound, Remote::NotFound)
        }
    }
}

impl RcsbClient for MetadataStub {
    fn fetch_archive(
        &self,
        _id: &PdbId,
        _source: ArchiveSource,
    ) -> Result<Remote<Vec<u8>>, KiraError> {
        Err(KiraError::RcsbHttp("not used".to_string()))
    }

    fn fetch_metadata(
        &self,
        _id: &PdbId,
        endpoint: MetadataEndpoint,
    ) -> Result<Remote<Value>, KiraError> {
        self.calls.lock().unwrap().push(endpoint);
        if self.offline {
            return Err(KiraError::RcsbHttp("connection refused".to_string()));
        }
        Ok(match endpoint {
            MetadataEndpoint::Assembly => self.assembly.clone(),
            MetadataEndpoint::Entry => self.entry.clone(),
        })
    }
}

fn id() -> PdbId {
    "4HHB".parse().unwrap()
}

#[test]
fn assembly_counts_win() {
    let client = MetadataStub::new(
        Remote::Found(json!({
            "rcsb_assembly_info": {
                "atom_count": 4779,
                "polymer_monomer_count": 574,
                "polymer_entity_instance_count": 4
            }
        })),
        Remote::NotFound,
    );
    let service = MetadataService::new(&client, 3, Duration::ZERO);

    let size = service.size_summary(&id()).unwrap();
    assert_eq!(
        size,
        SizeMetrics {
            atoms: 4779,
            residues: 574,
            chains: 4
        }
    );
    assert_eq!(*client.calls.lock().unwrap(), vec![MetadataEndpoint::Assembly]);
}

#[test]
fn entry_counts_when_assembly_missing() {
    let client = MetadataStub::new(
        Remote::NotFound,
        Remote::Found(json!({
            "rcsb_entry_info": {
                "deposited_atom_count": 1001,
                "deposited_polymer_monomer_count": 129,
                "deposited_polymer_entity_instance_count": 1
            }
        })),
    );
    let service = MetadataService::new(&client, 3, Duration::ZERO);

    let size = service.size_summary(&id()).unwrap();
    assert_eq!(size.atoms, 1001);
    assert_eq!(size.chains, 1);
}

#[test]
fn absent_everywhere_is_zero_size() {
    let client = MetadataStub::new(Remote::NotFound, Remote::NotFound);
    let service = MetadataService::new(&client, 3, Duration::ZERO);

    assert_eq!(service.size_summary(&id()).unwrap(), SizeMetrics::default());
    assert_eq!(client.calls.lock().unwrap().len(), 2);
}

#[test]
fn persistent_server_errors_are_an_outage() {
    let client = MetadataStub::new(Remote::ServerError { status: 503 }, Remote::NotFound);
    let service = MetadataService::new(&client, 4, Duration::ZERO);

    let err = service.size_summary(&id()).unwrap_err();
    assert_matches!(err, KiraError::RcsbOutage { attempts: 4, .. });
    assert!(err.is_batch_fatal());
    assert_eq!(client.calls.lock().unwrap().len(), 4);
}

#[test]
fn exhausted_connectivity_retries_are_not_an_outage() {
    let client = MetadataStub::offline();
    let service = MetadataService::new(&client, 3, Duration::ZERO);

    let err = service.size_summary(&id()).unwrap_err();
    assert_matches!(err, KiraError::RcsbHttp(_));
    assert!(!err.is_batch_fatal());
    assert_eq!(client.calls.lock().unwrap().len(), 3);
}

#[test]
fn malformed_payload_is_not_retried() {
    let client = MetadataStub::new(Remote::Found(json!({"unexpected": true})), Remote::NotFound);
    let service = MetadataService::new(&client, 5, Duration::ZERO);

    assert_matches!(
        service.size_summary(&id()),
        Err(KiraError::RcsbMalformed(_))
    );
    assert_eq!(client.calls.lock().unwrap().len(), 1);
}
