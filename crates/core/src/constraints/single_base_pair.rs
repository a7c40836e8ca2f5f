use super::{
    closes_hairpin, require_movable, require_present, retype_base_pairs, sorted_keys,
    ConstraintKind, InteractionConstraint, LinearInteraction,
};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{BasePairKey, BasePairType, FrozenSet, NucleotideKey, Scene};
use crate::topology::TopologyView;
use crate::vector2d::Vector2D;

/// The two nucleotides of one base pair, plus the hairpin it closes when requested.
#[derive(Debug, Clone)]
pub struct SingleBasePairConstraint {
    pair: (NucleotideKey, NucleotideKey),
    members: Vec<NucleotideKey>,
    interaction: LinearInteraction,
}

impl SingleBasePairConstraint {
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

        let mut members = vec![key.clone(), partner.clone()];
        if options.affect_hairpin_nucleotides && closes_hairpin(&view, key, &partner).is_some() {
            let lo = key.nucleotide_index.min(partner.nucleotide_index);
            let hi = key.nucleotide_index.max(partner.nucleotide_index);
            members.extend(
                ((lo + 1)..hi)
                    .map(|i| key.with_index(i))
                    .filter(|k| scene.contains(k)),
            );
        }
        let members = sorted_keys(members);
        require_movable(scene, &members, frozen, ConstraintKind::SingleBasePair)?;

        Ok(Self {
            interaction: LinearInteraction::new(key.clone(), &members, frozen),
            pair: (key.clone(), partner),
            members,
        })
    }

    pub fn base_pair(&self) -> BasePairKey {
        BasePairKey::new(
            &self.pair.0,
            &self.pair.1.molecule_name,
            self.pair.1.nucleotide_index,
        )
    }

    pub fn set_base_pair_type(&self, scene: &mut Scene, base_pair_type: BasePairType) -> RerenderBatch {
        retype_base_pairs(scene, &[self.base_pair()], base_pair_type)
    }
}

impl InteractionConstraint for SingleBasePairConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::SingleBasePair
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
