use std::fs;

use assert_matches::assert_matches;

use kira_structure_curator::config::ConfigLoader;
use kira_structure_curator::domain::{InputKind, PdbId, classify_input, read_id_list};
use kira_structure_curator::error::KiraError;

#[test]
fn classify_paths_and_ids() {
    let temp = tempfile::tempdir().unwrap();
    let structure = temp.path().join("1abc.pdb");
    let list = temp.path().join("ids.txt");
    fs::write(&structure, "END\n").unwrap();
    fs::write(&list, "1abc\n").unwrap();

    assert_matches!(
        classify_input(structure.to_str().unwrap()),
        Ok(InputKind::StructureFile(_))
    );
    assert_matches!(
        classify_input(list.to_str().unwrap()),
        Ok(InputKind::IdListFile(_))
    );
    assert_matches!(
        classify_input(temp.path().to_str().unwrap()),
        Ok(InputKind::StructureDir(_))
    );
    assert_matches!(classify_input("4HHB"), Ok(InputKind::PdbId(_)));
    assert_matches!(
        classify_input("not-an-id"),
        Err(KiraError::InvalidInput(_))
    );
}

#[test]
fn id_list_skips_blank_and_invalid_lines() {
    let temp = tempfile::tempdir().unwrap();
    let list = temp.path().join("ids.txt");
    fs::write(&list, "1abc.2.1\n\n4HHB\n?!\n  2xyz  \n").unwrap();

    let ids = read_id_list(&list).unwrap();
    let expected: Vec<PdbId> = ["1abc", "4HHB", "2xyz"]
        .iter()
        .map(|raw| raw.parse().unwrap())
        .collect();
    assert_eq!(ids, expected);
}

#[test]
fn missing_id_list_is_a_filesystem_error() {
    let temp = tempfile::tempdir().unwrap();
    assert_matches!(
        read_id_list(&temp.path().join("absent.txt")),
        Err(KiraError::Filesystem(_))
    );
}

#[test]
fn explicit_config_path_must_exist() {
    let temp = tempfile::tempdir().unwrap();
    let missing = temp.path().join("kira-sc.json");
    assert_matches!(
        ConfigLoader::resolve(missing.to_str()),
        Err(KiraError::ConfigRead(_))
    );
}

#[test]
fn explicit_config_is_loaded() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-sc.json");
    fs::write(
        &path,
        r#"{"retry_budget": 4, "identity_cutoff": 0.95, "early_exit_factor": 2.0}"#,
    )
    .unwrap();

    let settings = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(settings.retry_budget, 4);
    assert_eq!(settings.identity_cutoff, 0.95);
    assert_eq!(settings.early_exit_factor, Some(2.0));
    assert_eq!(settings.jobs, 1);
}

#[test]
fn out_of_range_cutoff_is_rejected() {
    assert_matches!(
        ConfigLoader::parse(r#"{"identity_cutoff": 1.5}"#),
        Err(KiraError::ConfigParse(_))
    );
}
