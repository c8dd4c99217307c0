use std::collections::BTreeMap;

use crate::align::SequenceAligner;
use crate::record::Stoichiometry;

pub const DEFAULT_IDENTITY_CUTOFF: f64 = 0.90;

struct Cluster<'s> {
    representative: &'s str,
    members: u32,
}

/// Groups chain sequences greedily: each sequence joins the first existing
/// cluster (in creation order) whose representative it matches at or above
/// `cutoff`, otherwise it founds a new cluster. Placement is final, so the
/// result depends on input order.
pub fn cluster_chains<A, S>(sequences: &[S], aligner: &A, cutoff: f64) -> Stoichiometry
where
    A: SequenceAligner + ?Sized,
    S: AsRef<str>,
{
    let mut clusters: Vec<Cluster<'_>> = Vec::new();

    for sequence in sequences {
        let sequence = sequence.as_ref();
        let joined = clusters.iter_mut().find(|cluster| {
            aligner.align(sequence, cluster.representative).identity() >= cutoff
        });
        match joined {
            Some(cluster) => cluster.members += 1,
            None => clusters.push(Cluster {
                representative: sequence,
                members: 1,
            }),
        }
    }

    let counts: BTreeMap<u32, u32> = clusters
        .into_iter()
        .enumerate()
        .map(|(index, cluster)| (index as u32, cluster.members))
        .collect();
    Stoichiometry::new(counts)
}
