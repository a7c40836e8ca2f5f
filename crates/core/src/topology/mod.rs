//! Graph traversals over backbone and base-pair edges.
//!
//! Nodes are nucleotide keys. Backbone edges join `i` and `i ± 1` inside one
//! molecule; base-pair edges join a residue to each entry of its base-pair list.

mod bounds;
mod cycle;
mod helix;
mod partition;
mod stacked;

pub use bounds::{
    find_single_strand, find_subdomain, BoundaryReason, SingleStrand, StrandBoundary, Subdomain,
};
pub use cycle::{find_cycle, Cycle};
pub use helix::{find_helix, walk_helix, CauseOfTermination, Helix, HelixWalk};
pub use partition::{
    free_standing_helices, partition_molecule, HelixDescriptor, HelixFilter, Partition,
};
pub use stacked::{find_stacked_helix, Bulge, StackedHelix};

use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::structure_graph::{BasePairType, MappedBasePair, Molecule, NucleotideKey, Scene};

/// Read-only view of a scene with the pair filter from [`ConstraintOptions`] applied.
#[derive(Clone, Copy)]
pub struct TopologyView<'a> {
    scene: &'a Scene,
    hide_mismatches: bool,
}

impl<'a> TopologyView<'a> {
    pub fn new(scene: &'a Scene, options: &ConstraintOptions) -> Self {
        Self {
            scene,
            hide_mismatches: options.treat_noncanonical_base_pairs_as_unpaired,
        }
    }

    pub fn scene(&self) -> &'a Scene {
        self.scene
    }

    pub fn contains(&self, key: &NucleotideKey) -> bool {
        self.scene.contains(key)
    }

    pub fn molecule(&self, key: &NucleotideKey) -> Option<&'a Molecule> {
        self.scene.molecule(key.complex_index, &key.molecule_name)
    }

    /// Base pairs of `key` that the traversal may follow.
    pub fn base_pairs(&self, key: &NucleotideKey) -> Vec<&'a MappedBasePair> {
        self.scene
            .get_base_pairs_for(key)
            .map(|pairs| {
                pairs
                    .iter()
                    .filter(|p| {
                        !(self.hide_mismatches && p.base_pair_type == Some(BasePairType::Mismatch))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn partners(&self, key: &NucleotideKey) -> Vec<NucleotideKey> {
        self.base_pairs(key)
            .into_iter()
            .map(|p| key.sibling(&p.molecule_name, p.nucleotide_index))
            .collect()
    }

    pub fn is_paired(&self, key: &NucleotideKey) -> bool {
        !self.base_pairs(key).is_empty()
    }

    pub fn are_paired(&self, key0: &NucleotideKey, key1: &NucleotideKey) -> bool {
        key0.complex_index == key1.complex_index
            && self.base_pairs(key0).iter().any(|p| {
                p.molecule_name == key1.molecule_name && p.nucleotide_index == key1.nucleotide_index
            })
    }

    /// Existing residues at `i - 1` and `i + 1`, in that order.
    pub fn backbone_neighbors(&self, key: &NucleotideKey) -> Vec<NucleotideKey> {
        [-1, 1]
            .into_iter()
            .filter_map(|step| key.offset(step))
            .filter(|k| self.contains(k))
            .collect()
    }

    /// Backbone neighbors followed by pair partners, without duplicates.
    pub fn neighbors(&self, key: &NucleotideKey) -> Vec<NucleotideKey> {
        let mut out = self.backbone_neighbors(key);
        let mut partners = self.partners(key);
        partners.sort();
        for p in partners {
            if !out.contains(&p) {
                out.push(p);
            }
        }
        out
    }

    /// Pick the partner of a base-paired `key`.
    ///
    /// A single pair needs no `secondary`. With several simultaneous pairs,
    /// `secondary` must name exactly one of them.
    pub fn resolve_partner(
        &self,
        key: &NucleotideKey,
        secondary: Option<&NucleotideKey>,
    ) -> Result<NucleotideKey, ConstraintError> {
        if !self.contains(key) {
            return Err(ConstraintError::not_found(key));
        }
        let partners = self.partners(key);
        let display = self.scene.display_index(key);
        match (partners.len(), secondary) {
            (0, _) => Err(ConstraintError::NonBasePairedNucleotide {
                message: format!(
                    "nucleotide #{display} of {} is not base-paired",
                    key.molecule_name
                ),
            }),
            (1, None) => Ok(partners[0].clone()),
            (_, Some(secondary)) => {
                let matches: Vec<_> = partners.iter().filter(|p| *p == secondary).collect();
                match matches.as_slice() {
                    [only] => Ok((*only).clone()),
                    _ => Err(ConstraintError::MultipleBasePairsNucleotide {
                        message: format!(
                            "nucleotide #{display} of {} is not paired with {secondary}",
                            key.molecule_name
                        ),
                    }),
                }
            }
            (n, None) => Err(ConstraintError::MultipleBasePairsNucleotide {
                message: format!(
                    "nucleotide #{display} of {} has {n} simultaneous base pairs; select its partner",
                    key.molecule_name
                ),
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::parser::build_complex;
    use crate::structure_graph::{LabelLine, NucleotideKey, Scene};
    use crate::vector2d::Vector2D;

    pub fn scene(structure: &str) -> Scene {
        let mut scene = Scene::new();
        scene
            .complexes
            .insert(0, build_complex("test", structure, None).unwrap());
        scene
    }

    pub fn key(index: i64) -> NucleotideKey {
        NucleotideKey::new(0, "strand0", index)
    }

    pub fn key_in(strand: usize, index: i64) -> NucleotideKey {
        NucleotideKey::new(0, format!("strand{strand}"), index)
    }

    /// Give `key` a label at `offset` with a two-point leader line.
    pub fn attach_label(scene: &mut Scene, key: &NucleotideKey, offset: Vector2D) {
        let n = scene.get_nucleotide_mut(key).unwrap();
        n.label_content_position = Some(offset);
        n.label_line = Some(LabelLine {
            points: vec![offset * 0.5, offset],
        });
    }

    /// Whether `key`'s label in `after` is its label in `before` turned by `angle`.
    pub fn label_turned(before: &Scene, after: &Scene, key: &NucleotideKey, angle: f64) -> bool {
        let close = |p: Vector2D, q: Vector2D| (p - q).magnitude() < 1e-9;
        let (b, a) = (
            before.get_nucleotide(key).unwrap(),
            after.get_nucleotide(key).unwrap(),
        );
        let content = close(
            a.label_content_position.unwrap(),
            b.label_content_position.unwrap().rotate(angle),
        );
        let line = a
            .label_line
            .as_ref()
            .unwrap()
            .points
            .iter()
            .zip(&b.label_line.as_ref().unwrap().points)
            .all(|(&p, &q)| close(p, q.rotate(angle)));
        content && line
    }
}
