use super::{
    closes_hairpin, require_movable, require_present, retype_base_pairs, sorted_keys,
    ConstraintKind, InteractionConstraint, LinearInteraction,
};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{BasePairType, FrozenSet, NucleotideKey, Scene};
use crate::topology::{find_helix, Helix, TopologyView};
use crate::vector2d::Vector2D;
use tracing::debug;

/// Both strands of one helix, dragged rigidly.
#[derive(Debug, Clone)]
pub struct HelixConstraint {
    helix: Helix,
    members: Vec<NucleotideKey>,
    interaction: LinearInteraction,
}

impl HelixConstraint {
    pub fn new(
        scene: &Scene,
        frozen: &FrozenSet,
        options: &ConstraintOptions,
        key: &NucleotideKey,
        partner: Option<&NucleotideKey>,
    ) -> Result<Self, ConstraintError> {
        require_present(scene, key)?;
        let view = TopologyView::new(scene, options);
        let partner = view.resolve_partner(key, partner)?;
        let helix = find_helix(&view, key, &partner);
        debug!(start = ?helix.start, stop = ?helix.stop, "helix walked");

        let mut members = helix.member_keys();
        if options.affect_hairpin_nucleotides {
            if let Some((lo, hi)) = closes_hairpin(&view, key, &partner) {
                members.extend(((lo + 1)..hi).map(|i| key.with_index(i)));
            }
        }
        let members = sorted_keys(members);
        require_movable(scene, &members, frozen, ConstraintKind::RnaHelix)?;

        Ok(Self {
            interaction: LinearInteraction::new(key.clone(), &members, frozen),
            helix,
            members,
        })
    }

    pub fn helix(&self) -> &Helix {
        &self.helix
    }

    pub fn set_base_pair_type(&self, scene: &mut Scene, base_pair_type: BasePairType) -> RerenderBatch {
        retype_base_pairs(scene, &self.helix.base_pair_keys(), base_pair_type)
    }
}

impl InteractionConstraint for HelixConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::RnaHelix
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
