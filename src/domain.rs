use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::KiraError;

pub const PDB_ID_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PdbId(String);

impl PdbId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn lower(&self) -> String {
        self.0.to_ascii_lowercase()
    }

    pub fn upper(&self) -> String {
        self.0.to_ascii_uppercase()
    }

    pub fn divided_hash(&self) -> String {
        self.lower()[1..3].to_string()
    }
}

impl fmt::Display for PdbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PdbId {
    type Err = KiraError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = trimmed.len() == PDB_ID_LENGTH
            && trimmed.chars().all(|ch| ch.is_ascii_alphanumeric());
        if !is_valid {
            return Err(KiraError::InvalidPdbId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Size,
    Stoichiometry,
    SecondaryStructure,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Size => "size",
            MetricKind::Stoichiometry => "stoichiometry",
            MetricKind::SecondaryStructure => "secondary_structure",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveSource {
    BiologicalAssembly,
    Bundle,
    Structure,
}

impl ArchiveSource {
    pub const PRIORITY: [ArchiveSource; 3] = [
        ArchiveSource::BiologicalAssembly,
        ArchiveSource::Bundle,
        ArchiveSource::Structure,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveSource::BiologicalAssembly => "pdb1.gz",
            ArchiveSource::Bundle => "tar.gz",
            ArchiveSource::Structure => "ent.gz",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        Self::PRIORITY
            .into_iter()
            .find(|source| name.ends_with(&format!(".{}", source.extension())))
    }
}

impl fmt::Display for ArchiveSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveSource::BiologicalAssembly => write!(f, "biological-assembly"),
            ArchiveSource::Bundle => write!(f, "bundle"),
            ArchiveSource::Structure => write!(f, "structure"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    PdbId(PdbId),
    StructureFile(PathBuf),
    IdListFile(PathBuf),
    StructureDir(PathBuf),
}

pub fn classify_input(value: &str) -> Result<InputKind, KiraError> {
    let path = Path::new(value);
    if path.is_file() {
        let is_structure = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.contains(".pdb") || name.contains(".ent"))
            .unwrap_or(false);
        return Ok(if is_structure {
            InputKind::StructureFile(path.to_path_buf())
        } else {
            InputKind::IdListFile(path.to_path_buf())
        });
    }
    if path.is_dir() {
        return Ok(InputKind::StructureDir(path.to_path_buf()));
    }
    match value.parse::<PdbId>() {
        Ok(id) => Ok(InputKind::PdbId(id)),
        Err(_) => Err(KiraError::InvalidInput(value.to_string())),
    }
}

pub fn parse_id_lines(content: &str) -> Vec<PdbId> {
    content
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .filter_map(|line| {
            let stem = line.split('.').next().unwrap_or(line);
            let token: String = stem.chars().take(PDB_ID_LENGTH).collect();
            match token.parse::<PdbId>() {
                Ok(id) => Some(id),
                Err(err) => {
                    warn!("skipping list entry {line:?}: {err}");
                    None
                }
            }
        })
        .collect()
}

pub fn read_id_list(path: &Path) -> Result<Vec<PdbId>, KiraError> {
    let content = fs::read_to_string(path)
        .map_err(|err| KiraError::Filesystem(format!("read {}: {err}", path.display())))?;
    Ok(parse_id_lines(&content))
}

pub fn parse_cluster_lines(content: &str) -> Vec<PdbId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for line in content.lines() {
        let Some(first) = line.split_whitespace().next() else {
            continue;
        };
        let entry = first.split('_').next().unwrap_or(first);
        if entry.len() != PDB_ID_LENGTH {
            continue;
        }
        if let Ok(id) = entry.parse::<PdbId>() {
            if seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn pdb_id_keeps_case() {
        let id: PdbId = " 1LyZ ".parse().unwrap();
        assert_eq!(id.as_str(), "1LyZ");
        assert_eq!(id.lower(), "1lyz");
        assert_eq!(id.divided_hash(), "ly");
    }

    #[test]
    fn pdb_id_rejects_wrong_length() {
        let err = "1LYZA".parse::<PdbId>().unwrap_err();
        assert_matches!(err, KiraError::InvalidPdbId(_));
    }

    #[test]
    fn archive_source_from_path() {
        assert_eq!(
            ArchiveSource::from_path(Path::new("/x/1abc.pdb1.gz")),
            Some(ArchiveSource::BiologicalAssembly)
        );
        assert_eq!(
            ArchiveSource::from_path(Path::new("1abc.tar.gz")),
            Some(ArchiveSource::Bundle)
        );
        assert_eq!(ArchiveSource::from_path(Path::new("1abc.pdb")), None);
    }

    #[test]
    fn id_lines_strip_suffixes() {
        let ids = parse_id_lines("1abc.3.0\n\n2xyz\nbad!\n4hhbextra\n");
        let ids: Vec<_> = ids.iter().map(|id| id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["1abc", "2xyz", "4hhb"]);
    }

    #[test]
    fn cluster_lines_take_first_member() {
        let content = "1ABC_1 2DEF_2\n1ABC_2 9ZZZ_1\nAF_AFP12345F1_1 3GHI_1\n5JKL_1\n";
        let ids: Vec<_> = parse_cluster_lines(content)
            .into_iter()
            .map(|id| id.to_string())
            .collect();
        assert_eq!(ids, vec!["1ABC", "5JKL"]);
    }

    #[test]
    fn classify_bare_id() {
        assert_matches!(classify_input("4hhb"), Ok(InputKind::PdbId(_)));
        assert_matches!(
            classify_input("definitely-not-here"),
            Err(KiraError::InvalidInput(_))
        );
    }
}
