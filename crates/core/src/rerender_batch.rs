use crate::structure_graph::{BasePairKey, NucleotideKey, Scene};
use serde::Serialize;
use std::collections::BTreeSet;

/// Keys the renderer must refresh after a mutation, kept sorted.
#[derive(Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct RerenderBatch {
    pub nucleotides: BTreeSet<NucleotideKey>,
    pub base_pairs: BTreeSet<BasePairKey>,
}

impl RerenderBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a changed nucleotide together with every base pair drawn from it.
    pub fn add_nucleotide(&mut self, scene: &Scene, key: &NucleotideKey) {
        if let Some(pairs) = scene.get_base_pairs_for(key) {
            for pair in pairs {
                self.base_pairs.insert(BasePairKey::new(
                    key,
                    &pair.molecule_name,
                    pair.nucleotide_index,
                ));
            }
        }
        self.nucleotides.insert(key.clone());
    }

    pub fn add_base_pair(&mut self, key: BasePairKey) {
        self.base_pairs.insert(key);
    }

    pub fn merge(&mut self, other: RerenderBatch) {
        self.nucleotides.extend(other.nucleotides);
        self.base_pairs.extend(other.base_pairs);
    }

    pub fn is_empty(&self) -> bool {
        self.nucleotides.is_empty() && self.base_pairs.is_empty()
    }
}
