use serde::{Deserialize, Serialize};

use crate::domain::MetricKind;
use crate::record::{MetricRecord, SecondaryStructureFractions, SizeMetrics, Stoichiometry};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bound<T> {
    pub min: T,
    pub max: Option<T>,
}

impl<T: PartialOrd + Copy> Bound<T> {
    pub fn new(min: T, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.min && self.max.is_none_or(|max| value <= max)
    }
}

impl Bound<u64> {
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            min: (self.min as f64 / factor).floor() as u64,
            max: self.max.map(|max| (max as f64 * factor).ceil() as u64),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeCriteria {
    pub atoms: Bound<u64>,
    pub residues: Bound<u64>,
    pub chains: Bound<u64>,
}

impl Default for SizeCriteria {
    fn default() -> Self {
        Self {
            atoms: Bound::new(1, None),
            residues: Bound::new(1, None),
            chains: Bound::new(1, None),
        }
    }
}

impl SizeCriteria {
    pub fn accepts(&self, size: &SizeMetrics) -> bool {
        self.atoms.contains(size.atoms)
            && self.residues.contains(size.residues)
            && self.chains.contains(size.chains)
    }

    pub fn relaxed(&self, factor: f64) -> Self {
        Self {
            atoms: self.atoms.scaled(factor),
            residues: self.residues.scaled(factor),
            chains: self.chains.scaled(factor),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoichiometryCriteria {
    pub chain_repeats: Bound<u32>,
    pub unique_chains: Bound<usize>,
    pub factorable: bool,
}

impl Default for StoichiometryCriteria {
    fn default() -> Self {
        Self {
            chain_repeats: Bound::new(1, None),
            unique_chains: Bound::new(1, None),
            factorable: false,
        }
    }
}

impl StoichiometryCriteria {
    pub fn accepts(&self, stoichiometry: &Stoichiometry) -> bool {
        stoichiometry
            .counts()
            .all(|count| self.chain_repeats.contains(count))
            && self.unique_chains.contains(stoichiometry.unique_chains())
            && (!self.factorable || stoichiometry.is_factorable())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecondaryStructureCriteria {
    pub helix: Bound<f64>,
    pub strand: Bound<f64>,
    pub coil: Bound<f64>,
}

impl Default for SecondaryStructureCriteria {
    fn default() -> Self {
        Self {
            helix: Bound::new(0.0, Some(1.0)),
            strand: Bound::new(0.0, Some(1.0)),
            coil: Bound::new(0.0, Some(1.0)),
        }
    }
}

impl SecondaryStructureCriteria {
    pub fn accepts(&self, fractions: &SecondaryStructureFractions) -> bool {
        self.helix.contains(fractions.helix)
            && self.strand.contains(fractions.strand)
            && self.coil.contains(fractions.coil)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub size: Option<SizeCriteria>,
    pub stoichiometry: Option<StoichiometryCriteria>,
    pub secondary_structure: Option<SecondaryStructureCriteria>,
}

impl FilterCriteria {
    pub fn kinds(&self) -> Vec<MetricKind> {
        let mut kinds = Vec::new();
        if self.size.is_some() {
            kinds.push(MetricKind::Size);
        }
        if self.stoichiometry.is_some() {
            kinds.push(MetricKind::Stoichiometry);
        }
        if self.secondary_structure.is_some() {
            kinds.push(MetricKind::SecondaryStructure);
        }
        kinds
    }
}

pub fn satisfies(record: &MetricRecord, criteria: &FilterCriteria) -> bool {
    match record {
        MetricRecord::Size(size) => criteria.size.is_none_or(|c| c.accepts(size)),
        MetricRecord::Stoichiometry(stoichiometry) => criteria
            .stoichiometry
            .is_none_or(|c| c.accepts(stoichiometry)),
        MetricRecord::SecondaryStructure(fractions) => criteria
            .secondary_structure
            .is_none_or(|c| c.accepts(fractions)),
    }
}
