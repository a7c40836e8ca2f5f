use super::TopologyView;
use crate::error::ConstraintError;
use crate::structure_graph::NucleotideKey;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tracing::trace;

/// A closed loop of backbone and base-pair edges.
///
/// `members[0]` and `members[last]` are the two nucleotides of the anchor
/// pair; the rest follow in traversal order between them.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub members: Vec<NucleotideKey>,
    pub anchor: (NucleotideKey, NucleotideKey),
}

impl Cycle {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Consecutive members joined by a base pair, anchor first.
    pub fn pair_edges<'a>(
        &'a self,
        view: &'a TopologyView<'_>,
    ) -> impl Iterator<Item = (&'a NucleotideKey, &'a NucleotideKey)> + 'a {
        let k = self.members.len();
        (0..k)
            .map(move |i| (&self.members[(i + k - 1) % k], &self.members[i]))
            .filter(move |(a, b)| view.are_paired(a, b))
    }
}

/// Per-molecule parent pointers of the breadth-first search tree.
#[derive(Default)]
struct ParentMaps {
    maps: BTreeMap<(u32, String), BTreeMap<i64, Option<NucleotideKey>>>,
}

impl ParentMaps {
    fn get(&self, key: &NucleotideKey) -> Option<&Option<NucleotideKey>> {
        self.maps
            .get(&(key.complex_index, key.molecule_name.clone()))
            .and_then(|m| m.get(&key.nucleotide_index))
    }

    fn visited(&self, key: &NucleotideKey) -> bool {
        self.get(key).is_some()
    }

    fn parent(&self, key: &NucleotideKey) -> Option<&NucleotideKey> {
        self.get(key).and_then(Option::as_ref)
    }

    fn insert(&mut self, key: &NucleotideKey, parent: Option<NucleotideKey>) {
        self.maps
            .entry((key.complex_index, key.molecule_name.clone()))
            .or_default()
            .insert(key.nucleotide_index, parent);
    }

    /// Path from the root down to `key`.
    fn chain(&self, key: &NucleotideKey) -> Vec<NucleotideKey> {
        let mut chain = vec![key.clone()];
        let mut current = key;
        while let Some(parent) = self.parent(current) {
            chain.push(parent.clone());
            current = parent;
        }
        chain.reverse();
        chain
    }
}

/// Find the loop through the unpaired nucleotide `start`.
///
/// Breadth-first search over backbone and base-pair edges until two branches
/// of the search tree meet in a node whose root paths share only the root.
pub fn find_cycle(view: &TopologyView<'_>, start: &NucleotideKey) -> Result<Cycle, ConstraintError> {
    let scene = view.scene();
    if !view.contains(start) {
        return Err(ConstraintError::not_found(start));
    }
    let display = scene.display_index(start);
    if view.is_paired(start) {
        return Err(ConstraintError::BasePairedNucleotide {
            message: format!(
                "nucleotide #{display} of {} is base-paired and cannot start a cycle",
                start.molecule_name
            ),
        });
    }
    if view.backbone_neighbors(start).len() < 2 {
        return Err(not_part_of_cycle(start, display));
    }

    let mut parents = ParentMaps::default();
    parents.insert(start, None);
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(u) = queue.pop_front() {
        let parent_of_u = parents.parent(&u).cloned();
        for v in view.neighbors(&u) {
            if Some(&v) == parent_of_u.as_ref() || parents.parent(&v) == Some(&u) {
                continue;
            }
            if !parents.visited(&v) {
                parents.insert(&v, Some(u.clone()));
                queue.push_back(v);
                continue;
            }

            let chain_u = parents.chain(&u);
            let chain_v = parents.chain(&v);
            let shared = chain_u.iter().filter(|k| chain_v.contains(k)).count();
            if shared != 1 {
                continue;
            }
            let mut loop_members = chain_u;
            loop_members.extend(chain_v.into_iter().skip(1).rev());
            if loop_members.len() < 3 {
                continue;
            }
            trace!(size = loop_members.len(), "cycle closed");
            return normalize(view, loop_members, start, display);
        }
    }

    Err(not_part_of_cycle(start, display))
}

/// Rotate the loop so it starts at the minimal anchor pair and ends at its partner.
fn normalize(
    view: &TopologyView<'_>,
    members: Vec<NucleotideKey>,
    start: &NucleotideKey,
    display: i64,
) -> Result<Cycle, ConstraintError> {
    let k = members.len();
    let anchor = (0..k)
        .map(|i| (&members[i], &members[(i + 1) % k]))
        .filter(|(a, b)| view.are_paired(a, b))
        .map(|(a, b)| if a <= b { (a, b) } else { (b, a) })
        .min()
        .map(|(a, b)| (a.clone(), b.clone()));
    let Some((anchor0, anchor1)) = anchor else {
        return Err(not_part_of_cycle(start, display));
    };

    let mut members = members;
    let position = members.iter().position(|m| *m == anchor0).unwrap_or(0);
    members.rotate_left(position);
    if members.get(1) == Some(&anchor1) {
        // Walk the other way round so the anchor partner comes last.
        members[1..].reverse();
    }

    Ok(Cycle {
        members,
        anchor: (anchor0, anchor1),
    })
}

fn not_part_of_cycle(start: &NucleotideKey, display: i64) -> ConstraintError {
    ConstraintError::NotPartOfCycle {
        message: format!(
            "nucleotide #{display} of {} is not part of a cycle",
            start.molecule_name
        ),
    }
}
