use super::TopologyView;
use crate::structure_graph::{BasePairKey, ComplexIndex, NucleotideIndex, NucleotideKey};
use serde::Serialize;

/// Why a helix walk stopped.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CauseOfTermination {
    EndOfMolecule,
    NonBasePairedNucleotide,
    RnaMoleculeMismatch,
    NoncontiguousBasePair,
    /// The two strands of an intra-molecule helix would meet or cross.
    StrandsMeet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelixWalk {
    /// Last valid `(i0, i1)` pair reached.
    pub extremum: (NucleotideIndex, NucleotideIndex),
    pub cause: CauseOfTermination,
    pub steps: usize,
}

/// Walk a helix from the paired residues `start0`/`start1`.
///
/// Each step advances strand 0 by `direction` and strand 1 by `-direction`.
/// The walk continues while the next strand-0 residue exists, is paired, and
/// pairs with exactly the next strand-1 residue.
pub fn walk_helix(
    view: &TopologyView<'_>,
    start0: &NucleotideKey,
    start1: &NucleotideKey,
    direction: NucleotideIndex,
) -> HelixWalk {
    let same_molecule = start0.same_molecule(start1);
    let mut current = (start0.nucleotide_index, start1.nucleotide_index);
    let mut steps = 0;

    let cause = loop {
        let (Some(next0), Some(next1)) = (
            current.0.checked_add(direction),
            current.1.checked_sub(direction),
        ) else {
            break CauseOfTermination::EndOfMolecule;
        };
        let key0 = start0.with_index(next0);

        if !view.contains(&key0) {
            break CauseOfTermination::EndOfMolecule;
        }
        if same_molecule && (next0 == next1 || (next0 < next1) != (current.0 < current.1)) {
            break CauseOfTermination::StrandsMeet;
        }
        let pairs = view.base_pairs(&key0);
        if pairs.is_empty() {
            break CauseOfTermination::NonBasePairedNucleotide;
        }
        let on_partner_molecule: Vec<_> = pairs
            .iter()
            .filter(|p| p.molecule_name == start1.molecule_name)
            .collect();
        if on_partner_molecule.is_empty() {
            break CauseOfTermination::RnaMoleculeMismatch;
        }
        if !on_partner_molecule
            .iter()
            .any(|p| p.nucleotide_index == next1)
        {
            break CauseOfTermination::NoncontiguousBasePair;
        }

        current = (next0, next1);
        steps += 1;
    };

    HelixWalk {
        extremum: current,
        cause,
        steps,
    }
}

/// A maximal run of contiguous antiparallel base pairs.
///
/// Strand 0 runs `start.0..=stop.0` ascending while strand 1 runs from
/// `start.1` down to `stop.1`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Helix {
    pub complex_index: ComplexIndex,
    pub molecule0: String,
    pub molecule1: String,
    pub start: (NucleotideIndex, NucleotideIndex),
    pub stop: (NucleotideIndex, NucleotideIndex),
    pub start_cause: CauseOfTermination,
    pub stop_cause: CauseOfTermination,
}

/// The full helix through the pair `key0`/`key1`: the walk toward lower
/// strand-0 indices unioned with the walk toward higher ones.
pub fn find_helix(view: &TopologyView<'_>, key0: &NucleotideKey, key1: &NucleotideKey) -> Helix {
    let backward = walk_helix(view, key0, key1, -1);
    let forward = walk_helix(view, key0, key1, 1);
    Helix {
        complex_index: key0.complex_index,
        molecule0: key0.molecule_name.clone(),
        molecule1: key1.molecule_name.clone(),
        start: backward.extremum,
        stop: forward.extremum,
        start_cause: backward.cause,
        stop_cause: forward.cause,
    }
}

impl Helix {
    pub fn len(&self) -> usize {
        (self.stop.0 - self.start.0 + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.stop.0 < self.start.0
    }

    pub fn same_molecule(&self) -> bool {
        self.molecule0 == self.molecule1
    }

    pub fn key0(&self, index: NucleotideIndex) -> NucleotideKey {
        NucleotideKey::new(self.complex_index, self.molecule0.clone(), index)
    }

    pub fn key1(&self, index: NucleotideIndex) -> NucleotideKey {
        NucleotideKey::new(self.complex_index, self.molecule1.clone(), index)
    }

    /// Every `(i0, i1)` pair from `start` to `stop`.
    pub fn pairs(&self) -> impl Iterator<Item = (NucleotideIndex, NucleotideIndex)> + '_ {
        (0..self.len() as NucleotideIndex).map(move |k| (self.start.0 + k, self.start.1 - k))
    }

    /// Strand-0 keys ascending.
    pub fn strand0_keys(&self) -> Vec<NucleotideKey> {
        (self.start.0..=self.stop.0).map(|i| self.key0(i)).collect()
    }

    /// Strand-1 keys ascending.
    pub fn strand1_keys(&self) -> Vec<NucleotideKey> {
        (self.stop.1..=self.start.1).map(|i| self.key1(i)).collect()
    }

    /// Both strands, sorted and deduplicated.
    pub fn member_keys(&self) -> Vec<NucleotideKey> {
        let mut keys = self.strand0_keys();
        keys.extend(self.strand1_keys());
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn base_pair_keys(&self) -> Vec<BasePairKey> {
        self.pairs()
            .map(|(i0, i1)| BasePairKey::new(&self.key0(i0), &self.molecule1, i1))
            .collect()
    }

    /// The pair with the widest span, i.e. the one farther from the loop.
    /// Only meaningful for intra-molecule helices.
    pub fn outer_pair(&self) -> (NucleotideIndex, NucleotideIndex) {
        if (self.start.0 - self.start.1).abs() >= (self.stop.0 - self.stop.1).abs() {
            self.start
        } else {
            self.stop
        }
    }

    /// The pair with the narrowest span, next to the enclosed loop.
    pub fn inner_pair(&self) -> (NucleotideIndex, NucleotideIndex) {
        if self.outer_pair() == self.start {
            self.stop
        } else {
            self.start
        }
    }

    /// Cause recorded at the inner end.
    pub fn inner_cause(&self) -> CauseOfTermination {
        if self.outer_pair() == self.start {
            self.stop_cause
        } else {
            self.start_cause
        }
    }
}
