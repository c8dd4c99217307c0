use std::path::Path;

use crate::align::{Alignment, GlobalAligner, SequenceAligner};
use crate::error::KiraError;
use crate::structure::{self, Atom, Residue, Structure};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SseClass {
    Helix,
    Strand,
    Coil,
}

pub trait StructureToolkit: SequenceAligner {
    fn parse(&self, path: &Path) -> Result<Structure, KiraError>;
    fn save(&self, path: &Path, structure: &Structure) -> Result<(), KiraError>;
    fn clean(&self, structure: Structure) -> Structure;
    fn secondary_structure_labels(&self, structure: &Structure) -> Vec<Option<SseClass>>;
    fn resolution_of(&self, path: &Path) -> Result<Option<f64>, KiraError>;
}

#[derive(Debug, Clone, Default)]
pub struct NativeToolkit {
    aligner: GlobalAligner,
    geometry: SseGeometry,
}

impl NativeToolkit {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceAligner for NativeToolkit {
    fn align(&self, first: &str, second: &str) -> Alignment {
        self.aligner.align(first, second)
    }
}

impl StructureToolkit for NativeToolkit {
    fn parse(&self, path: &Path) -> Result<Structure, KiraError> {
        structure::read_structure(path)
    }

    fn save(&self, path: &Path, structure: &Structure) -> Result<(), KiraError> {
        let mut buffer = Vec::new();
        structure::write_pdb(&mut buffer, structure)
            .map_err(|err| KiraError::Filesystem(err.to_string()))?;
        let path = camino::Utf8Path::from_path(path)
            .ok_or_else(|| KiraError::Filesystem(format!("non-utf8 path {}", path.display())))?;
        crate::store::Store::write_bytes_atomic(path, &buffer)
    }

    fn clean(&self, structure: Structure) -> Structure {
        let mut kept = Vec::with_capacity(structure.atoms.len());
        for residue in structure.residues() {
            if is_water(residue.name()) || (residue.is_hetero() && !is_polymer_residue(&residue)) {
                continue;
            }
            let first_alt = residue.atoms().iter().find_map(|atom| atom.alt_loc);
            kept.extend(
                residue
                    .atoms()
                    .iter()
                    .filter(|atom| !atom.is_hydrogen())
                    .filter(|atom| atom.alt_loc.is_none() || atom.alt_loc == first_alt)
                    .cloned()
                    .map(|atom| Atom {
                        alt_loc: None,
                        ..atom
                    }),
            );
        }
        Structure::new(kept)
    }

    fn secondary_structure_labels(&self, structure: &Structure) -> Vec<Option<SseClass>> {
        let mut labels = Vec::new();
        for chain in structure.chains() {
            let residues = chain.residues();
            let ca: Vec<Option<[f64; 3]>> = residues
                .iter()
                .map(|residue| residue.atom("CA").map(|atom| atom.position))
                .collect();
            let positions: Vec<[f64; 3]> = ca.iter().flatten().copied().collect();
            let mut classes = self.geometry.classify(&positions).into_iter();
            labels.extend(ca.iter().map(|slot| slot.and_then(|_| classes.next())));
        }
        labels
    }

    fn resolution_of(&self, path: &Path) -> Result<Option<f64>, KiraError> {
        structure::resolution_of(path)
    }
}

fn is_water(name: &str) -> bool {
    matches!(name, "HOH" | "WAT" | "DOD" | "H2O")
}

fn is_polymer_residue(residue: &Residue<'_>) -> bool {
    ["N", "CA", "C"]
        .iter()
        .all(|name| residue.atom(name).is_some())
}

#[derive(Debug, Clone)]
pub struct SseGeometry {
    helix_i3: (f64, f64),
    helix_i4: (f64, f64),
    strand_i2: (f64, f64),
    min_helix_length: usize,
    min_strand_length: usize,
}

impl Default for SseGeometry {
    fn default() -> Self {
        Self {
            // ideal α-helix: CA(i)-CA(i+3) ~5.3 Å, CA(i)-CA(i+4) ~6.2 Å
            helix_i3: (4.5, 6.0),
            helix_i4: (5.0, 7.0),
            // extended strand: CA(i)-CA(i+2) ~6.8 Å
            strand_i2: (6.2, 7.5),
            min_helix_length: 4,
            min_strand_length: 3,
        }
    }
}

impl SseGeometry {
    pub fn classify(&self, ca: &[[f64; 3]]) -> Vec<SseClass> {
        let n = ca.len();
        let mut classes = vec![SseClass::Coil; n];
        if n < 3 {
            return classes;
        }
        let within = |i: usize, j: usize, (low, high): (f64, f64)| {
            let d = distance(&ca[i], &ca[j]);
            d >= low && d <= high
        };

        for i in 0..n {
            let mut helix = 0.0;
            if i + 3 < n && within(i, i + 3, self.helix_i3) {
                helix += 1.0;
            }
            if i + 4 < n && within(i, i + 4, self.helix_i4) {
                helix += 1.0;
            }
            if i >= 3 && within(i - 3, i, self.helix_i3) {
                helix += 0.5;
            }
            if i >= 4 && within(i - 4, i, self.helix_i4) {
                helix += 0.5;
            }
            if helix >= 1.5 {
                classes[i] = SseClass::Helix;
                continue;
            }

            let mut strand = 0.0;
            if i + 2 < n && within(i, i + 2, self.strand_i2) {
                strand += 1.0;
            } else if i >= 2 && within(i - 2, i, self.strand_i2) {
                strand += 1.0;
            }
            if i >= 1 && i + 2 < n && dihedral(&ca[i - 1], &ca[i], &ca[i + 1], &ca[i + 2]).abs() > 2.5
            {
                strand += 0.5;
            }
            if strand >= 1.0 {
                classes[i] = SseClass::Strand;
            }
        }

        self.drop_short_runs(&mut classes, SseClass::Helix, self.min_helix_length);
        self.drop_short_runs(&mut classes, SseClass::Strand, self.min_strand_length);
        classes
    }

    fn drop_short_runs(&self, classes: &mut [SseClass], class: SseClass, min_length: usize) {
        let mut start = 0;
        while start < classes.len() {
            if classes[start] != class {
                start += 1;
                continue;
            }
            let mut end = start;
            while end < classes.len() && classes[end] == class {
                end += 1;
            }
            if end - start < min_length {
                classes[start..end].fill(SseClass::Coil);
            }
            start = end;
        }
    }
}

fn distance(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2) + (a[2] - b[2]).powi(2)).sqrt()
}

fn dihedral(p0: &[f64; 3], p1: &[f64; 3], p2: &[f64; 3], p3: &[f64; 3]) -> f64 {
    let sub = |a: &[f64; 3], b: &[f64; 3]| [a[0] - b[0], a[1] - b[1], a[2] - b[2]];
    let cross = |a: [f64; 3], b: [f64; 3]| {
        [
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]
    };
    let dot = |a: [f64; 3], b: [f64; 3]| a[0] * b[0] + a[1] * b[1] + a[2] * b[2];

    let b1 = sub(p1, p0);
    let b2 = sub(p2, p1);
    let b3 = sub(p3, p2);
    let n1 = cross(b1, b2);
    let n2 = cross(b2, b3);
    let b2_len = dot(b2, b2).sqrt();
    if b2_len == 0.0 {
        return 0.0;
    }
    let m1 = cross(n1, [b2[0] / b2_len, b2[1] / b2_len, b2[2] / b2_len]);
    dot(m1, n2).atan2(dot(n1, n2))
}
