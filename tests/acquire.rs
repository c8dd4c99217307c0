use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde_json::Value;

use kira_structure_curator::acquire::AcquisitionManager;
use kira_structure_curator::domain::{ArchiveSource, PdbId};
use kira_structure_curator::error::KiraError;
use kira_structure_curator::rcsb::{MetadataEndpoint, RcsbClient, Remote};
use kira_structure_curator::store::Store;

#[derive(Clone, Copy)]
enum Answer {
    Found,
    Missing,
    Server,
    Offline,
}

struct ScriptedRcsb {
    answers: HashMap<ArchiveSource, Answer>,
    calls: Mutex<Vec<ArchiveSource>>,
}

impl ScriptedRcsb {
    fn new(answers: [(ArchiveSource, Answer); 3]) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<ArchiveSource> {
        self.calls.lock().unwrap().clone()
    }
}

impl RcsbClient for ScriptedRcsb {
    fn fetch_archive(
        &self,
        _id: &PdbId,
        source: ArchiveSource,
    ) -> Result<Remote<Vec<u8>>, KiraError> {
        self.calls.lock().unwrap().push(source);
        match self.answers[&source] {
            Answer::Found => Ok(Remote::Found(format!("payload from {source}").into_bytes())),
            Answer::Missing => Ok(Remote::NotFound),
            Answer::Server => Ok(Remote::ServerError { status: 503 }),
            Answer::Offline => Err(KiraError::RcsbHttp("connection refused".to_string())),
        }
    }

    fn fetch_metadata(
        &self,
        _id: &PdbId,
        _endpoint: MetadataEndpoint,
    ) -> Result<Remote<Value>, KiraError> {
        Err(KiraError::RcsbHttp("not used".to_string()))
    }
}

fn temp_store() -> (tempfile::TempDir, Store) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let store = Store::new_with_root(root);
    store.ensure_layout().unwrap();
    (temp, store)
}

fn id() -> PdbId {
    "1abc".parse().unwrap()
}

#[test]
fn falls_back_to_structure_file_in_one_chain() {
    let (_temp, store) = temp_store();
    let client = ScriptedRcsb::new([
        (ArchiveSource::BiologicalAssembly, Answer::Missing),
        (ArchiveSource::Bundle, Answer::Missing),
        (ArchiveSource::Structure, Answer::Found),
    ]);
    let manager = AcquisitionManager::new(&client, &store, 10, Duration::ZERO);

    assert!(manager.acquire(&id()).unwrap());
    assert_eq!(
        client.calls(),
        vec![
            ArchiveSource::BiologicalAssembly,
            ArchiveSource::Bundle,
            ArchiveSource::Structure
        ]
    );
    let path = store.downloaded_path(&id(), ArchiveSource::Structure);
    assert_eq!(
        fs::read_to_string(path.as_std_path()).unwrap(),
        "payload from structure"
    );
}

#[test]
fn server_error_falls_through_to_next_endpoint() {
    let (_temp, store) = temp_store();
    let client = ScriptedRcsb::new([
        (ArchiveSource::BiologicalAssembly, Answer::Server),
        (ArchiveSource::Bundle, Answer::Found),
        (ArchiveSource::Structure, Answer::Found),
    ]);
    let manager = AcquisitionManager::new(&client, &store, 10, Duration::ZERO);

    let path = manager.acquire_path(&id()).unwrap().unwrap();
    assert!(path.as_str().ends_with("1abc.tar.gz"));
    assert_eq!(client.calls().len(), 2);
}

#[test]
fn connectivity_failures_spend_the_whole_budget() {
    let (_temp, store) = temp_store();
    let client = ScriptedRcsb::new([
        (ArchiveSource::BiologicalAssembly, Answer::Offline),
        (ArchiveSource::Bundle, Answer::Offline),
        (ArchiveSource::Structure, Answer::Offline),
    ]);
    let manager = AcquisitionManager::new(&client, &store, 10, Duration::ZERO);

    assert!(!manager.acquire(&id()).unwrap());
    let calls = client.calls();
    assert_eq!(calls.len(), 10);
    assert!(
        calls
            .iter()
            .all(|source| *source == ArchiveSource::BiologicalAssembly)
    );
    let leftovers = fs::read_dir(store.downloaded_dir().as_std_path())
        .unwrap()
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn clean_absence_gives_up_without_retrying() {
    let (_temp, store) = temp_store();
    let client = ScriptedRcsb::new([
        (ArchiveSource::BiologicalAssembly, Answer::Missing),
        (ArchiveSource::Bundle, Answer::Server),
        (ArchiveSource::Structure, Answer::Missing),
    ]);
    let manager = AcquisitionManager::new(&client, &store, 10, Duration::ZERO);

    assert_eq!(manager.acquire_path(&id()).unwrap(), None);
    assert_eq!(client.calls().len(), 3);
    assert_eq!(store.find_downloaded(&id()), None);
}

#[test]
fn existing_archive_skips_the_network() {
    let (_temp, store) = temp_store();
    let existing = store.downloaded_path(&id(), ArchiveSource::Bundle);
    fs::write(existing.as_std_path(), b"already here").unwrap();
    let client = ScriptedRcsb::new([
        (ArchiveSource::BiologicalAssembly, Answer::Found),
        (ArchiveSource::Bundle, Answer::Found),
        (ArchiveSource::Structure, Answer::Found),
    ]);
    let manager = AcquisitionManager::new(&client, &store, 10, Duration::ZERO);

    assert_eq!(manager.acquire_path(&id()).unwrap(), Some(existing.clone()));
    assert!(client.calls().is_empty());
    assert_eq!(fs::read(existing.as_std_path()).unwrap(), b"already here");
}
