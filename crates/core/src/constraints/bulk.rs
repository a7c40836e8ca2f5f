use super::{
    require_movable, require_present, retype_base_pairs, ConstraintKind, InteractionConstraint,
    LinearInteraction,
};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{BasePairType, FrozenSet, NucleotideKey, Scene};
use crate::topology::{free_standing_helices, HelixDescriptor, HelixFilter, TopologyView};
use crate::vector2d::Vector2D;
use tracing::debug;

/// Whole-molecule, whole-complex, whole-scene and same-color selections.
///
/// All four drag linearly; complex and scene selections also carry their
/// free-standing helices for bulk base-pair formatting.
#[derive(Debug, Clone)]
pub struct BulkConstraint {
    kind: ConstraintKind,
    members: Vec<NucleotideKey>,
    interaction: LinearInteraction,
    helices: Option<Vec<HelixDescriptor>>,
}

impl BulkConstraint {
    pub fn new(
        scene: &Scene,
        frozen: &FrozenSet,
        options: &ConstraintOptions,
        kind: ConstraintKind,
        key: &NucleotideKey,
    ) -> Result<Self, ConstraintError> {
        require_present(scene, key)?;
        let view = TopologyView::new(scene, options);

        let (members, helices) = match kind {
            ConstraintKind::RnaMolecule => {
                let members: Vec<NucleotideKey> = view
                    .molecule(key)
                    .map(|m| m.nucleotides.keys().map(|&i| key.with_index(i)).collect())
                    .unwrap_or_default();
                if let Some((inner, outer)) = members.iter().find_map(|k| {
                    view.partners(k)
                        .into_iter()
                        .find(|p| !p.same_molecule(k))
                        .map(|p| (k, p))
                }) {
                    return Err(ConstraintError::complex_arrangement(format!(
                        "#{} of {} pairs with #{} of {}; drag the complex instead",
                        scene.display_index(inner),
                        inner.molecule_name,
                        scene.display_index(&outer),
                        outer.molecule_name
                    )));
                }
                (members, None)
            }
            ConstraintKind::RnaComplex => {
                let members: Vec<NucleotideKey> = scene
                    .keys()
                    .filter(|k| k.complex_index == key.complex_index)
                    .collect();
                let helices =
                    free_standing_helices(&view, Some(key.complex_index), HelixFilter::KeyOrder);
                (members, Some(helices))
            }
            ConstraintKind::EntireScene => {
                let members: Vec<NucleotideKey> =
                    scene.keys().filter(|k| !frozen.contains(k)).collect();
                let helices = free_standing_helices(&view, None, HelixFilter::KeyOrder);
                (members, Some(helices))
            }
            ConstraintKind::SingleColor => {
                let color = scene.get_nucleotide(key).and_then(|n| n.color);
                let members: Vec<NucleotideKey> = scene
                    .keys()
                    .filter(|k| scene.get_nucleotide(k).map(|n| n.color) == Some(color))
                    .collect();
                (members, None)
            }
            other => {
                return Err(ConstraintError::UnsupportedOperation {
                    operation: "bulk selection",
                    kind: other,
                })
            }
        };
        debug!(
            members = members.len(),
            helices = helices.as_ref().map_or(0, Vec::len),
            "bulk selection"
        );

        require_movable(scene, &members, frozen, kind)?;
        Ok(Self {
            kind,
            interaction: LinearInteraction::new(key.clone(), &members, frozen),
            members,
            helices,
        })
    }

    /// Free-standing helices of a complex or scene selection, each reported once.
    pub fn helices(&self) -> Option<&[HelixDescriptor]> {
        self.helices.as_deref()
    }

    pub fn set_base_pair_type_for_helices(
        &self,
        scene: &mut Scene,
        base_pair_type: BasePairType,
    ) -> RerenderBatch {
        let pairs: Vec<_> = self
            .helices
            .iter()
            .flatten()
            .flat_map(HelixDescriptor::base_pair_keys)
            .collect();
        retype_base_pairs(scene, &pairs, base_pair_type)
    }
}

impl InteractionConstraint for BulkConstraint {
    fn kind(&self) -> ConstraintKind {
        self.kind
    }

    fn member_keys(&self) -> &[NucleotideKey] {
        &self.members
    }

    fn initiate_drag(&mut self, scene: &Scene) -> Vector2D {
        self.interaction.initiate(scene)
    }

    fn continue_drag(
        &mut self,
        scene: &mut Scene,
        total_drag: Vector2D,
        _reposition_annotations: bool,
    ) -> RerenderBatch {
        self.interaction.update(scene, total_drag)
    }
}
