use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::MetricKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SizeMetrics {
    pub atoms: u64,
    pub residues: u64,
    pub chains: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stoichiometry(BTreeMap<u32, u32>);

impl Stoichiometry {
    pub fn new(counts: BTreeMap<u32, u32>) -> Self {
        Self(counts)
    }

    pub fn counts(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.values().copied()
    }

    pub fn unique_chains(&self) -> usize {
        self.0.len()
    }

    pub fn max_repeat(&self) -> Option<u32> {
        self.counts().max()
    }

    pub fn is_factorable(&self) -> bool {
        match self.max_repeat() {
            Some(max) => self.counts().all(|count| count > 0 && max % count == 0),
            None => true,
        }
    }

    pub fn as_map(&self) -> &BTreeMap<u32, u32> {
        &self.0
    }
}

impl<const N: usize> From<[(u32, u32); N]> for Stoichiometry {
    fn from(pairs: [(u32, u32); N]) -> Self {
        Self(BTreeMap::from(pairs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondaryStructureFractions {
    pub helix: f64,
    pub strand: f64,
    pub coil: f64,
}

impl SecondaryStructureFractions {
    pub const ALL_COIL: Self = Self {
        helix: 0.0,
        strand: 0.0,
        coil: 1.0,
    };
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricRecord {
    Size(SizeMetrics),
    Stoichiometry(Stoichiometry),
    SecondaryStructure(SecondaryStructureFractions),
}

impl MetricRecord {
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricRecord::Size(_) => MetricKind::Size,
            MetricRecord::Stoichiometry(_) => MetricKind::Stoichiometry,
            MetricRecord::SecondaryStructure(_) => MetricKind::SecondaryStructure,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        match self {
            MetricRecord::Size(value) => serde_json::to_vec(value),
            MetricRecord::Stoichiometry(value) => serde_json::to_vec(value),
            MetricRecord::SecondaryStructure(value) => serde_json::to_vec(value),
        }
    }

    pub fn from_json(kind: MetricKind, bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Self::from_value(kind, serde_json::from_slice(bytes)?)
    }

    pub fn from_value(kind: MetricKind, value: Value) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            MetricKind::Size => MetricRecord::Size(serde_json::from_value(value)?),
            MetricKind::Stoichiometry => MetricRecord::Stoichiometry(serde_json::from_value(value)?),
            MetricKind::SecondaryStructure => {
                MetricRecord::SecondaryStructure(serde_json::from_value(value)?)
            }
        })
    }
}
