const ALPHABET: &[u8; 24] = b"ARNDCQEGHILKMFPSTWYVBZX*";

#[rustfmt::skip]
const BLOSUM62: [[i32; 24]; 24] = [
    [ 4, -1, -2, -2,  0, -1, -1,  0, -2, -1, -1, -1, -1, -2, -1,  1,  0, -3, -2,  0, -2, -1,  0, -4],
    [-1,  5,  0, -2, -3,  1,  0, -2,  0, -3, -2,  2, -1, -3, -2, -1, -1, -3, -2, -3, -1,  0, -1, -4],
    [-2,  0,  6,  1, -3,  0,  0,  0,  1, -3, -3,  0, -2, -3, -2,  1,  0, -4, -2, -3,  3,  0, -1, -4],
    [-2, -2,  1,  6, -3,  0,  2, -1, -1, -3, -4, -1, -3, -3, -1,  0, -1, -4, -3, -3,  4,  1, -1, -4],
    [ 0, -3, -3, -3,  9, -3, -4, -3, -3, -1, -1, -3, -1, -2, -3, -1, -1, -2, -2, -1, -3, -3, -2, -4],
    [-1,  1,  0,  0, -3,  5,  2, -2,  0, -3, -2,  1,  0, -3, -1,  0, -1, -2, -1, -2,  0,  3, -1, -4],
    [-1,  0,  0,  2, -4,  2,  5, -2,  0, -3, -3,  1, -2, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4],
    [ 0, -2,  0, -1, -3, -2, -2,  6, -2, -4, -4, -2, -3, -3, -2,  0, -2, -2, -3, -3, -1, -2, -1, -4],
    [-2,  0,  1, -1, -3,  0,  0, -2,  8, -3, -3, -1, -2, -1, -2, -1, -2, -2,  2, -3,  0,  0, -1, -4],
    [-1, -3, -3, -3, -1, -3, -3, -4, -3,  4,  2, -3,  1,  0, -3, -2, -1, -3, -1,  3, -3, -3, -1, -4],
    [-1, -2, -3, -4, -1, -2, -3, -4, -3,  2,  4, -2,  2,  0, -3, -2, -1, -2, -1,  1, -4, -3, -1, -4],
    [-1,  2,  0, -1, -3,  1,  1, -2, -1, -3, -2,  5, -1, -3, -1,  0, -1, -3, -2, -2,  0,  1, -1, -4],
    [-1, -1, -2, -3, -1,  0, -2, -3, -2,  1,  2, -1,  5,  0, -2, -1, -1, -1, -1,  1, -3, -1, -1, -4],
    [-2, -3, -3, -3, -2, -3, -3, -3, -1,  0,  0, -3,  0,  6, -4, -2, -2,  1,  3, -1, -3, -3, -1, -4],
    [-1, -2, -2, -1, -3, -1, -1, -2, -2, -3, -3, -1, -2, -4,  7, -1, -1, -4, -3, -2, -2, -1, -2, -4],
    [ 1, -1,  1,  0, -1,  0,  0,  0, -1, -2, -2,  0, -1, -2, -1,  4,  1, -3, -2, -2,  0,  0,  0, -4],
    [ 0, -1,  0, -1, -1, -1, -1, -2, -2, -1, -1, -1, -1, -2, -1,  1,  5, -2, -2,  0, -1, -1,  0, -4],
    [-3, -3, -4, -4, -2, -2, -3, -2, -2, -3, -2, -3, -1,  1, -4, -3, -2, 11,  2, -3, -4, -3, -2, -4],
    [-2, -2, -2, -3, -2, -1, -2, -3,  2, -1, -1, -2, -1,  3, -3, -2, -2,  2,  7, -1, -3, -2, -1, -4],
    [ 0, -3, -3, -3, -1, -2, -2, -3, -3,  3,  1, -2,  1, -1, -2, -2,  0, -3, -1,  4, -3, -2, -1, -4],
    [-2, -1,  3,  4, -3,  0,  1, -1,  0, -3, -4,  0, -3, -3, -2,  0, -1, -4, -3, -3,  4,  1, -1, -4],
    [-1,  0,  0,  1, -3,  3,  4, -2,  0, -3, -3,  1, -1, -3, -1,  0, -1, -3, -2, -2,  1,  4, -1, -4],
    [ 0, -1, -1, -1, -2, -1, -1, -1, -1, -1, -1, -1, -1, -1, -2,  0,  0, -2, -1, -1, -1, -1, -1, -4],
    [-4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4, -4,  1],
];

pub const DEFAULT_GAP_PENALTY: i32 = -10;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alignment {
    pub trace: Vec<(Option<usize>, Option<usize>)>,
    pub score: i32,
}

impl Alignment {
    pub fn identity(&self) -> f64 {
        if self.trace.is_empty() {
            return 0.0;
        }
        let paired = self
            .trace
            .iter()
            .filter(|(a, b)| a.is_some() && b.is_some())
            .count();
        paired as f64 / self.trace.len() as f64
    }
}

pub trait SequenceAligner: Send + Sync {
    fn align(&self, first: &str, second: &str) -> Alignment;
}

#[derive(Debug, Clone, Copy)]
pub struct GlobalAligner {
    gap_penalty: i32,
}

impl Default for GlobalAligner {
    fn default() -> Self {
        Self {
            gap_penalty: DEFAULT_GAP_PENALTY,
        }
    }
}

impl GlobalAligner {
    pub fn new(gap_penalty: i32) -> Self {
        Self { gap_penalty }
    }
}

impl SequenceAligner for GlobalAligner {
    fn align(&self, first: &str, second: &str) -> Alignment {
        let a: Vec<usize> = first.bytes().map(symbol_index).collect();
        let b: Vec<usize> = second.bytes().map(symbol_index).collect();
        let (n, m) = (a.len(), b.len());
        let gap = self.gap_penalty;

        let width = m + 1;
        let mut score = vec![0i32; (n + 1) * width];
        for i in 1..=n {
            score[i * width] = gap * i as i32;
        }
        for j in 1..=m {
            score[j] = gap * j as i32;
        }
        for i in 1..=n {
            for j in 1..=m {
                let diagonal = score[(i - 1) * width + j - 1] + BLOSUM62[a[i - 1]][b[j - 1]];
                let up = score[(i - 1) * width + j] + gap;
                let left = score[i * width + j - 1] + gap;
                score[i * width + j] = diagonal.max(up).max(left);
            }
        }

        let mut trace = Vec::with_capacity(n.max(m));
        let (mut i, mut j) = (n, m);
        while i > 0 || j > 0 {
            let here = score[i * width + j];
            if i > 0
                && j > 0
                && here == score[(i - 1) * width + j - 1] + BLOSUM62[a[i - 1]][b[j - 1]]
            {
                trace.push((Some(i - 1), Some(j - 1)));
                i -= 1;
                j -= 1;
            } else if i > 0 && here == score[(i - 1) * width + j] + gap {
                trace.push((Some(i - 1), None));
                i -= 1;
            } else {
                trace.push((None, Some(j - 1)));
                j -= 1;
            }
        }
        trace.reverse();

        Alignment {
            trace,
            score: score[n * width + m],
        }
    }
}

fn symbol_index(symbol: u8) -> usize {
    let upper = symbol.to_ascii_uppercase();
    ALPHABET
        .iter()
        .position(|candidate| *candidate == upper)
        .unwrap_or(22)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_align_fully() {
        let alignment = GlobalAligner::default().align("MKTAYIAKQR", "MKTAYIAKQR");
        assert_eq!(alignment.trace.len(), 10);
        assert_eq!(alignment.identity(), 1.0);
        assert_eq!(alignment.trace[3], (Some(3), Some(3)));
    }

    #[test]
    fn length_difference_becomes_gaps() {
        let alignment = GlobalAligner::default().align("MKTAYIAKQR", "MKTAY");
        assert_eq!(alignment.trace.len(), 10);
        assert_eq!(alignment.identity(), 0.5);
        assert!(alignment.trace.iter().all(|(a, _)| a.is_some()));
    }

    #[test]
    fn unknown_residues_score_as_wildcard() {
        let alignment = GlobalAligner::default().align("AXA", "A?A");
        assert_eq!(alignment.identity(), 1.0);
    }

    #[test]
    fn empty_input() {
        let alignment = GlobalAligner::default().align("", "");
        assert!(alignment.trace.is_empty());
        assert_eq!(alignment.identity(), 0.0);
    }
}
