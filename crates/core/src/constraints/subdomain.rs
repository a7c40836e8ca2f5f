use super::{
    require_movable, require_present, ConstraintKind, InteractionConstraint, LinearInteraction,
};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{FrozenSet, NucleotideKey, Scene};
use crate::topology::{find_subdomain, Subdomain, TopologyView};
use crate::vector2d::Vector2D;

/// Everything enclosed by the outermost pair of the clicked helix.
#[derive(Debug, Clone)]
pub struct SubdomainConstraint {
    subdomain: Subdomain,
    interaction: LinearInteraction,
}

impl SubdomainConstraint {
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
        let subdomain = find_subdomain(&view, key, &partner)?;
        require_movable(scene, &subdomain.members, frozen, ConstraintKind::RnaSubDomain)?;
        Ok(Self {
            interaction: LinearInteraction::new(key.clone(), &subdomain.members, frozen),
            subdomain,
        })
    }

    pub fn bounding_pair(&self) -> (&NucleotideKey, &NucleotideKey) {
        (&self.subdomain.bounding_pair.0, &self.subdomain.bounding_pair.1)
    }
}

impl InteractionConstraint for SubdomainConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::RnaSubDomain
    }

    fn member_keys(&self) -> &[NucleotideKey] {
        &self.subdomain.members
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::test_support::{key, scene};

    #[test]
    fn test_subdomain_drag_leaves_outside_alone() {
        let mut scene = scene("..((.((...)).))..");
        let outside = scene.position(&key(0));
        let mut c = SubdomainConstraint::new(
            &scene,
            &FrozenSet::new(),
            &ConstraintOptions::default(),
            &key(6),
            None,
        )
        .unwrap();
        assert_eq!(c.bounding_pair(), (&key(5), &key(11)));
        assert_eq!(c.member_keys().len(), 7);
        c.initiate_drag(&scene);
        c.continue_drag(&mut scene, Vector2D::new(3.0, 3.0), false);
        assert_eq!(scene.position(&key(0)), outside);
    }
}
