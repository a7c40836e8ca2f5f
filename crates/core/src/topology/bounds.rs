use super::helix::find_helix;
use super::TopologyView;
use crate::error::ConstraintError;
use crate::structure_graph::{FrozenSet, NucleotideIndex, NucleotideKey, Scene};
use crate::vector2d::Vector2D;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryReason {
    BasePair,
    /// The frozen status changed and truncation was requested.
    FrozenBoundary,
}

/// How one end of a single strand terminates.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub enum StrandBoundary {
    /// The strand stops next to `anchor`, which is not a member.
    Anchored {
        anchor: NucleotideKey,
        reason: BoundaryReason,
    },
    /// The molecule ends.
    Free,
}

impl StrandBoundary {
    pub fn is_anchored(&self) -> bool {
        matches!(self, StrandBoundary::Anchored { .. })
    }

    pub fn anchor(&self) -> Option<&NucleotideKey> {
        match self {
            StrandBoundary::Anchored { anchor, .. } => Some(anchor),
            StrandBoundary::Free => None,
        }
    }
}

/// A maximal run of unpaired residues.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SingleStrand {
    /// Ascending by index.
    pub members: Vec<NucleotideKey>,
    pub lower: StrandBoundary,
    pub upper: StrandBoundary,
}

impl SingleStrand {
    pub fn anchored_count(&self) -> usize {
        usize::from(self.lower.is_anchored()) + usize::from(self.upper.is_anchored())
    }

    /// Boundary point of the lower end: the anchor, or the first member when free.
    pub fn lower_point(&self, scene: &Scene) -> Option<Vector2D> {
        match self.lower.anchor() {
            Some(anchor) => scene.position(anchor),
            None => self.members.first().and_then(|k| scene.position(k)),
        }
    }

    /// Boundary point of the upper end: the anchor, or the last member when free.
    pub fn upper_point(&self, scene: &Scene) -> Option<Vector2D> {
        match self.upper.anchor() {
            Some(anchor) => scene.position(anchor),
            None => self.members.last().and_then(|k| scene.position(k)),
        }
    }
}

/// Extend from the unpaired `start` in both directions while residues stay unpaired.
///
/// With `truncate`, the run also stops where the frozen status differs from `start`'s.
pub fn find_single_strand(
    view: &TopologyView<'_>,
    start: &NucleotideKey,
    frozen: &FrozenSet,
    truncate: bool,
) -> Result<SingleStrand, ConstraintError> {
    if !view.contains(start) {
        return Err(ConstraintError::not_found(start));
    }
    if view.is_paired(start) {
        return Err(ConstraintError::BasePairedNucleotide {
            message: format!(
                "nucleotide #{} of {} is base-paired and cannot start a single strand",
                view.scene().display_index(start),
                start.molecule_name
            ),
        });
    }

    let start_frozen = frozen.contains(start);
    let extend = |direction: NucleotideIndex| -> (Vec<NucleotideKey>, StrandBoundary) {
        let mut run = Vec::new();
        let mut current = start.clone();
        let boundary = loop {
            let Some(key) = current.offset(direction).filter(|k| view.contains(k)) else {
                break StrandBoundary::Free;
            };
            if view.is_paired(&key) {
                break StrandBoundary::Anchored {
                    anchor: key,
                    reason: BoundaryReason::BasePair,
                };
            }
            if truncate && frozen.contains(&key) != start_frozen {
                break StrandBoundary::Anchored {
                    anchor: key,
                    reason: BoundaryReason::FrozenBoundary,
                };
            }
            run.push(key.clone());
            current = key;
        };
        (run, boundary)
    };

    let (mut below, lower) = extend(-1);
    let (above, upper) = extend(1);
    below.reverse();
    below.push(start.clone());
    below.extend(above);

    Ok(SingleStrand {
        members: below,
        lower,
        upper,
    })
}

/// Everything enclosed by one intra-molecule base pair.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Subdomain {
    /// `(lower, upper)` ends of the bounding pair.
    pub bounding_pair: (NucleotideKey, NucleotideKey),
    /// The bounding pair and every residue strictly between it, ascending.
    pub members: Vec<NucleotideKey>,
}

/// Bound the region closed by the outermost pair of the helix through `key0`/`key1`.
pub fn find_subdomain(
    view: &TopologyView<'_>,
    key0: &NucleotideKey,
    key1: &NucleotideKey,
) -> Result<Subdomain, ConstraintError> {
    let scene = view.scene();
    if !key0.same_molecule(key1) {
        return Err(ConstraintError::complex_arrangement(format!(
            "base pair between {} #{} and {} #{} spans two molecules",
            key0.molecule_name,
            scene.display_index(key0),
            key1.molecule_name,
            scene.display_index(key1),
        )));
    }

    let helix = find_helix(view, key0, key1);
    let (a, b) = helix.outer_pair();
    let (lo, hi) = (a.min(b), a.max(b));

    let members: Vec<NucleotideKey> = (lo..=hi)
        .map(|i| key0.with_index(i))
        .filter(|k| view.contains(k))
        .collect();

    for member in &members {
        for partner in view.partners(member) {
            let inside = partner.same_molecule(member)
                && (lo..=hi).contains(&partner.nucleotide_index);
            if !inside {
                return Err(ConstraintError::complex_arrangement(format!(
                    "nucleotide #{} of {} pairs outside the subdomain closed by #{} and #{}",
                    scene.display_index(member),
                    member.molecule_name,
                    scene.display_index(&key0.with_index(lo)),
                    scene.display_index(&key0.with_index(hi)),
                )));
            }
        }
    }

    Ok(Subdomain {
        bounding_pair: (key0.with_index(lo), key0.with_index(hi)),
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{key, key_in, scene};
    use super::*;
    use crate::error::ConstraintErrorKind;
    use crate::options::ConstraintOptions;

    fn indices(keys: &[NucleotideKey]) -> Vec<i64> {
        keys.iter().map(|k| k.nucleotide_index).collect()
    }

    #[test]
    fn test_hairpin_loop_is_anchored_both_sides() {
        let scene = scene("((..))");
        let view = TopologyView::new(&scene, &ConstraintOptions::default());
        let strand = find_single_strand(&view, &key(2), &FrozenSet::new(), false).unwrap();
        assert_eq!(indices(&strand.members), vec![2, 3]);
        assert_eq!(strand.lower.anchor(), Some(&key(1)));
        assert_eq!(strand.upper.anchor(), Some(&key(4)));
        assert_eq!(strand.anchored_count(), 2);
    }

    #[test]
    fn test_dangling_end_is_free() {
        let scene = scene("..((...))");
        let view = TopologyView::new(&scene, &ConstraintOptions::default());
        let strand = find_single_strand(&view, &key(0), &FrozenSet::new(), false).unwrap();
        assert_eq!(indices(&strand.members), vec![0, 1]);
        assert_eq!(strand.lower, StrandBoundary::Free);
        assert_eq!(strand.upper.anchor(), Some(&key(2)));
        assert_eq!(strand.lower_point(&scene), scene.position(&key(0)));
    }

    #[test]
    fn test_truncation_at_frozen_boundary() {
        let scene = scene("(......)");
        let view = TopologyView::new(&scene, &ConstraintOptions::default());
        let frozen: FrozenSet = [key(5), key(6)].into_iter().collect();
        let strand = find_single_strand(&view, &key(2), &frozen, true).unwrap();
        assert_eq!(indices(&strand.members), vec![1, 2, 3, 4]);
        assert_eq!(
            strand.upper,
            StrandBoundary::Anchored {
                anchor: key(5),
                reason: BoundaryReason::FrozenBoundary
            }
        );
        let untruncated = find_single_strand(&view, &key(2), &frozen, false).unwrap();
        assert_eq!(untruncated.members.len(), 6);
    }

    #[test]
    fn test_single_strand_rejects_paired_start() {
        let scene = scene("(.)");
        let view = TopologyView::new(&scene, &ConstraintOptions::default());
        let err = find_single_strand(&view, &key(0), &FrozenSet::new(), false).unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::BasePairedNucleotide);
    }

    #[test]
    fn test_subdomain_from_inner_pair() {
        let scene = scene(".((.((...)).))..");
        let view = TopologyView::new(&scene, &ConstraintOptions::default());
        // (2,12) is the inner pair of the helix (1,13)(2,12).
        let sub = find_subdomain(&view, &key(12), &key(2)).unwrap();
        assert_eq!(sub.bounding_pair, (key(1), key(13)));
        assert_eq!(indices(&sub.members), (1..=13).collect::<Vec<_>>());
    }

    #[test]
    fn test_subdomain_rejects_pseudoknot_and_cross_molecule() {
        let scene = scene("((..[[..))..]]");
        let view = TopologyView::new(&scene, &ConstraintOptions::default());
        let err = find_subdomain(&view, &key(0), &key(9)).unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::ComplexBasePairArrangement);

        let duplex = super::super::test_support::scene("((+))");
        let view = TopologyView::new(&duplex, &ConstraintOptions::default());
        let err = find_subdomain(&view, &key(0), &key_in(1, 1)).unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::ComplexBasePairArrangement);
    }
}
