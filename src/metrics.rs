use crate::align::SequenceAligner;
use crate::cluster::cluster_chains;
use crate::domain::MetricKind;
use crate::record::{MetricRecord, SecondaryStructureFractions, SizeMetrics, Stoichiometry};
use crate::structure::Structure;
use crate::toolkit::{SseClass, StructureToolkit};

pub const UNKNOWN_RESIDUE: char = 'X';

pub fn residue_letter(res_name: &str) -> char {
    match res_name {
        "ALA" => 'A',
        "CYS" => 'C',
        "ASP" => 'D',
        "GLU" => 'E',
        "PHE" => 'F',
        "GLY" => 'G',
        "HIS" => 'H',
        "ILE" => 'I',
        "LYS" => 'K',
        "LEU" => 'L',
        "MET" => 'M',
        "ASN" => 'N',
        "PRO" => 'P',
        "GLN" => 'Q',
        "ARG" => 'R',
        "SER" => 'S',
        "THR" => 'T',
        "VAL" => 'V',
        "TRP" => 'W',
        "TYR" => 'Y',
        _ => UNKNOWN_RESIDUE,
    }
}

pub fn chain_sequences(structure: &Structure) -> Vec<String> {
    structure
        .chains()
        .iter()
        .map(|chain| {
            chain
                .residues()
                .iter()
                .map(|residue| residue_letter(residue.name()))
                .collect()
        })
        .collect()
}

pub fn size_metrics(structure: &Structure) -> SizeMetrics {
    SizeMetrics {
        atoms: structure.atom_count() as u64,
        residues: structure.residue_count() as u64,
        chains: structure.chain_count() as u64,
    }
}

pub fn stoichiometry<A: SequenceAligner + ?Sized>(
    structure: &Structure,
    aligner: &A,
    identity_cutoff: f64,
) -> Option<Stoichiometry> {
    let sequences = chain_sequences(structure);
    if sequences.is_empty() {
        return None;
    }
    Some(cluster_chains(&sequences, aligner, identity_cutoff))
}

/// Fractions over residues that received a label; unlabeled residues are left
/// out of the denominator. With no labeled residue at all the result is all coil.
pub fn secondary_structure_fractions(labels: &[Option<SseClass>]) -> SecondaryStructureFractions {
    let labeled: Vec<SseClass> = labels.iter().flatten().copied().collect();
    if labeled.is_empty() {
        return SecondaryStructureFractions::ALL_COIL;
    }
    let total = labeled.len() as f64;
    let count = |class: SseClass| labeled.iter().filter(|label| **label == class).count();
    let helix = count(SseClass::Helix);
    let strand = count(SseClass::Strand);
    SecondaryStructureFractions {
        helix: helix as f64 / total,
        strand: strand as f64 / total,
        coil: (labeled.len() - helix - strand) as f64 / total,
    }
}

pub fn derive<T: StructureToolkit + ?Sized>(
    kind: MetricKind,
    structure: &Structure,
    toolkit: &T,
    identity_cutoff: f64,
) -> Option<MetricRecord> {
    match kind {
        MetricKind::Size => Some(MetricRecord::Size(size_metrics(structure))),
        MetricKind::Stoichiometry => {
            stoichiometry(structure, toolkit, identity_cutoff).map(MetricRecord::Stoichiometry)
        }
        MetricKind::SecondaryStructure => {
            let labels = toolkit.secondary_structure_labels(structure);
            Some(MetricRecord::SecondaryStructure(
                secondary_structure_fractions(&labels),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::align::GlobalAligner;
    use crate::structure::{ModelPolicy, read_pdb};

    const HETERODIMER: &str = "\
ATOM      1  CA  MET A   1       0.000   0.000   0.000  1.00  0.00           C
ATOM      2  CA  LYS A   2       3.800   0.000   0.000  1.00  0.00           C
ATOM      3  CA  MSE A   3       7.600   0.000   0.000  1.00  0.00           C
ATOM      4  CA  GLY B   1       0.000   9.000   0.000  1.00  0.00           C
ATOM      5  CA  TRP B   2       3.800   9.000   0.000  1.00  0.00           C
";

    fn heterodimer() -> Structure {
        Structure::new(read_pdb(Cursor::new(HETERODIMER), ModelPolicy::All, 1).unwrap())
    }

    #[test]
    fn sequences_use_wildcard() {
        assert_eq!(chain_sequences(&heterodimer()), vec!["MKX", "GW"]);
    }

    #[test]
    fn size_counts() {
        assert_eq!(
            size_metrics(&heterodimer()),
            SizeMetrics {
                atoms: 5,
                residues: 5,
                chains: 2
            }
        );
    }

    #[test]
    fn empty_structure_has_no_stoichiometry() {
        assert_eq!(
            stoichiometry(&Structure::default(), &GlobalAligner::default(), 0.9),
            None
        );
    }

    #[test]
    fn unlabeled_residues_leave_denominator() {
        let labels = [
            Some(SseClass::Helix),
            None,
            Some(SseClass::Strand),
            Some(SseClass::Coil),
            Some(SseClass::Helix),
            None,
        ];
        let fractions = secondary_structure_fractions(&labels);
        assert_eq!(fractions.helix, 0.5);
        assert_eq!(fractions.strand, 0.25);
        assert_eq!(fractions.coil, 0.25);
    }

    #[test]
    fn no_labels_is_all_coil() {
        assert_eq!(
            secondary_structure_fractions(&[None, None]),
            SecondaryStructureFractions::ALL_COIL
        );
        assert_eq!(
            secondary_structure_fractions(&[]),
            SecondaryStructureFractions {
                helix: 0.0,
                strand: 0.0,
                coil: 1.0
            }
        );
    }
}
