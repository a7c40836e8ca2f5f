use super::helix::walk_helix;
use super::TopologyView;
use crate::structure_graph::{BasePairKey, ComplexIndex, NucleotideIndex, NucleotideKey};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

/// Which end of a helix reports it during a partition scan.
///
/// A helix is seen from both of its strands; the filter decides whether it is
/// reported once or twice.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum HelixFilter {
    #[default]
    None,
    /// Keep a helix only when its start index is below its partner index.
    StartBeforePartner,
    /// Keep a helix only when its start key sorts before its partner key.
    KeyOrder,
    /// Keep inter-molecule helices, and intra-molecule ones whose start precedes the partner.
    MoleculeMode,
}

/// A helix found by a partition scan, seen from `molecule_name`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct HelixDescriptor {
    pub complex_index: ComplexIndex,
    pub molecule_name: String,
    pub partner_molecule: String,
    pub start: (NucleotideIndex, NucleotideIndex),
    pub stop: (NucleotideIndex, NucleotideIndex),
}

impl HelixDescriptor {
    pub fn pairs(&self) -> impl Iterator<Item = (NucleotideIndex, NucleotideIndex)> + '_ {
        (0..=(self.stop.0 - self.start.0)).map(move |k| (self.start.0 + k, self.start.1 - k))
    }

    pub fn base_pair_keys(&self) -> Vec<BasePairKey> {
        self.pairs()
            .map(|(i0, i1)| {
                let key0 = NucleotideKey::new(self.complex_index, self.molecule_name.clone(), i0);
                BasePairKey::new(&key0, &self.partner_molecule, i1)
            })
            .collect()
    }
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    /// Inclusive `(first, last)` runs of unpaired residues.
    pub free_runs: Vec<(NucleotideIndex, NucleotideIndex)>,
    pub helices: Vec<HelixDescriptor>,
}

impl HelixFilter {
    fn keep(self, start: &NucleotideKey, partner: &NucleotideKey) -> bool {
        match self {
            HelixFilter::None => true,
            HelixFilter::StartBeforePartner => start.nucleotide_index < partner.nucleotide_index,
            HelixFilter::KeyOrder => start < partner,
            HelixFilter::MoleculeMode => {
                !start.same_molecule(partner) || start.nucleotide_index < partner.nucleotide_index
            }
        }
    }
}

/// Split `range` of one molecule into unpaired runs and the helices starting in it.
pub fn partition_molecule(
    view: &TopologyView<'_>,
    complex_index: ComplexIndex,
    molecule_name: &str,
    range: RangeInclusive<NucleotideIndex>,
    filter: HelixFilter,
) -> Partition {
    let mut partition = Partition::default();
    let Some(molecule) = view.scene().molecule(complex_index, molecule_name) else {
        return partition;
    };

    let mut run: Option<(NucleotideIndex, NucleotideIndex)> = None;
    for (&i, _) in molecule.nucleotides.range(range) {
        let key = NucleotideKey::new(complex_index, molecule_name, i);
        let mut partners = view.partners(&key);
        if partners.is_empty() {
            run = match run {
                Some((first, last)) if last + 1 == i => Some((first, i)),
                Some(done) => {
                    partition.free_runs.push(done);
                    Some((i, i))
                }
                None => Some((i, i)),
            };
            continue;
        }
        if let Some(done) = run.take() {
            partition.free_runs.push(done);
        }

        partners.sort();
        for partner in partners {
            let continues = match (key.offset(-1), partner.offset(1)) {
                (Some(before), Some(after)) => view.are_paired(&before, &after),
                _ => false,
            };
            if continues || !filter.keep(&key, &partner) {
                continue;
            }
            let walk = walk_helix(view, &key, &partner, 1);
            partition.helices.push(HelixDescriptor {
                complex_index,
                molecule_name: molecule_name.to_string(),
                partner_molecule: partner.molecule_name.clone(),
                start: (i, partner.nucleotide_index),
                stop: walk.extremum,
            });
        }
    }
    if let Some(done) = run {
        partition.free_runs.push(done);
    }
    partition
}

/// Helices of every molecule in one complex, or in the whole scene.
pub fn free_standing_helices(
    view: &TopologyView<'_>,
    complex: Option<ComplexIndex>,
    filter: HelixFilter,
) -> Vec<HelixDescriptor> {
    let mut helices = Vec::new();
    for (&complex_index, c) in &view.scene().complexes {
        if complex.is_some_and(|wanted| wanted != complex_index) {
            continue;
        }
        for name in c.molecules.keys() {
            let partition = partition_molecule(
                view,
                complex_index,
                name,
                NucleotideIndex::MIN..=NucleotideIndex::MAX,
                filter,
            );
            helices.extend(partition.helices);
        }
    }
    helices
}
