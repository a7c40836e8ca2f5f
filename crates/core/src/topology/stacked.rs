use super::helix::{find_helix, Helix};
use super::TopologyView;
use crate::error::ConstraintError;
use crate::structure_graph::{BasePairKey, NucleotideIndex, NucleotideKey};
use serde::Serialize;
use tracing::trace;

/// Unpaired residues separating two stacked helix segments.
/// Either strand may be empty.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Bulge {
    pub strand0: Vec<NucleotideIndex>,
    pub strand1: Vec<NucleotideIndex>,
}

/// Helix segments joined by bulges, ordered by ascending strand-0 index.
/// `bulges[i]` lies between `segments[i]` and `segments[i + 1]`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct StackedHelix {
    pub segments: Vec<Helix>,
    pub bulges: Vec<Bulge>,
}

/// Follow the helix through `key0`/`key1`, then keep stepping across bulges
/// on both sides for as long as the two strands reconnect with a new pair.
pub fn find_stacked_helix(
    view: &TopologyView<'_>,
    key0: &NucleotideKey,
    key1: &NucleotideKey,
) -> Result<StackedHelix, ConstraintError> {
    let first = find_helix(view, key0, key1);
    let mut segments = std::collections::VecDeque::from([first]);
    let mut bulges = std::collections::VecDeque::new();

    // Toward higher strand-0 indices.
    while let Some(back) = segments.back() {
        let Some((bulge, next)) = reconnect(view, back, 1)? else {
            break;
        };
        trace!(start = ?next.start, stop = ?next.stop, "stacked segment after bulge");
        bulges.push_back(bulge);
        segments.push_back(next);
    }

    // Toward lower strand-0 indices.
    while let Some(front) = segments.front() {
        let Some((bulge, next)) = reconnect(view, front, -1)? else {
            break;
        };
        trace!(start = ?next.start, stop = ?next.stop, "stacked segment before bulge");
        bulges.push_front(bulge);
        segments.push_front(next);
    }

    Ok(StackedHelix {
        segments: segments.into(),
        bulges: bulges.into(),
    })
}

/// Scan both strands outward from one end of `helix` over unpaired residues.
///
/// Returns the bulge and the next segment when the first paired residue on
/// each strand pairs with the other in the helix's antiparallel sense.
fn reconnect(
    view: &TopologyView<'_>,
    helix: &Helix,
    direction: NucleotideIndex,
) -> Result<Option<(Bulge, Helix)>, ConstraintError> {
    let end = if direction > 0 { helix.stop } else { helix.start };

    let Some((run0, a0)) = scan_unpaired(view, &helix.key0(end.0), direction) else {
        return Ok(None);
    };
    let Some((run1, a1)) = scan_unpaired(view, &helix.key1(end.1), -direction) else {
        return Ok(None);
    };
    if run0.is_empty() && run1.is_empty() {
        // The helix ended on a noncontiguous pair, not on a bulge.
        return Ok(None);
    }

    let key_a0 = helix.key0(a0);
    let key_a1 = helix.key1(a1);
    if helix.same_molecule() {
        // Reconnecting across the enclosed loop would fold the helix onto itself.
        let orientation = end.0 < end.1;
        if a0 == a1 || (a0 < a1) != orientation {
            return Ok(None);
        }
    }
    if !view.are_paired(&key_a0, &key_a1) {
        return Ok(None);
    }

    let toward1 = count_pairs_on(view, &key_a0, &helix.molecule1);
    let toward0 = count_pairs_on(view, &key_a1, &helix.molecule0);
    if toward1 > 1 || toward0 > 1 {
        return Err(ConstraintError::complex_arrangement(format!(
            "stacked helix reconnects ambiguously at nucleotides #{} and #{}",
            view.scene().display_index(&key_a0),
            view.scene().display_index(&key_a1),
        )));
    }

    let next = find_helix(view, &key_a0, &key_a1);
    let mut bulge = Bulge {
        strand0: run0,
        strand1: run1,
    };
    bulge.strand0.sort_unstable();
    bulge.strand1.sort_unstable();
    Ok(Some((bulge, next)))
}

/// Unpaired residues after `from` in `direction`, plus the first paired index.
/// `None` when the molecule ends first.
fn scan_unpaired(
    view: &TopologyView<'_>,
    from: &NucleotideKey,
    direction: NucleotideIndex,
) -> Option<(Vec<NucleotideIndex>, NucleotideIndex)> {
    let mut run = Vec::new();
    let mut current = from.clone();
    loop {
        let key = current.offset(direction).filter(|k| view.contains(k))?;
        if view.is_paired(&key) {
            return Some((run, key.nucleotide_index));
        }
        run.push(key.nucleotide_index);
        current = key;
    }
}

fn count_pairs_on(view: &TopologyView<'_>, key: &NucleotideKey, molecule_name: &str) -> usize {
    view.base_pairs(key)
        .iter()
        .filter(|p| p.molecule_name == molecule_name)
        .count()
}

impl StackedHelix {
    /// Every residue of every segment and bulge, sorted.
    pub fn member_keys(&self) -> Vec<NucleotideKey> {
        let mut keys: Vec<NucleotideKey> = self
            .segments
            .iter()
            .flat_map(|segment| segment.member_keys())
            .collect();
        if let Some(first) = self.segments.first() {
            for bulge in &self.bulges {
                keys.extend(bulge.strand0.iter().map(|&i| first.key0(i)));
                keys.extend(bulge.strand1.iter().map(|&i| first.key1(i)));
            }
        }
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn base_pair_keys(&self) -> Vec<BasePairKey> {
        self.segments
            .iter()
            .flat_map(|segment| segment.base_pair_keys())
            .collect()
    }
}
