use super::{
    require_movable, require_present, retype_base_pairs, ConstraintKind, InteractionConstraint,
    LinearInteraction,
};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{BasePairType, FrozenSet, NucleotideKey, Scene};
use crate::topology::{find_stacked_helix, StackedHelix, TopologyView};
use crate::vector2d::Vector2D;
use tracing::debug;

/// Helix segments joined by bulges, dragged as one unit.
#[derive(Debug, Clone)]
pub struct StackedHelixConstraint {
    stacked: StackedHelix,
    members: Vec<NucleotideKey>,
    interaction: LinearInteraction,
}

impl StackedHelixConstraint {
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
        let stacked = find_stacked_helix(&view, key, &partner)?;
        debug!(
            segments = stacked.segments.len(),
            bulges = stacked.bulges.len(),
            "stacked helix walked"
        );

        let members = stacked.member_keys();
        require_movable(scene, &members, frozen, ConstraintKind::RnaStackedHelix)?;
        Ok(Self {
            interaction: LinearInteraction::new(key.clone(), &members, frozen),
            stacked,
            members,
        })
    }

    pub fn stacked_helix(&self) -> &StackedHelix {
        &self.stacked
    }

    pub fn set_base_pair_type(&self, scene: &mut Scene, base_pair_type: BasePairType) -> RerenderBatch {
        retype_base_pairs(scene, &self.stacked.base_pair_keys(), base_pair_type)
    }
}

impl InteractionConstraint for StackedHelixConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::RnaStackedHelix
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
