use super::{require_present, ConstraintKind, InteractionConstraint};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{FrozenSet, NucleotideKey, Scene};
use crate::topology::TopologyView;
use crate::vector2d::Vector2D;
use tracing::warn;

/// Moves exactly the clicked nucleotide.
#[derive(Debug, Clone)]
pub struct SingleNucleotideConstraint {
    members: [NucleotideKey; 1],
    is_base_paired: bool,
    origin: Option<Vector2D>,
}

impl SingleNucleotideConstraint {
    pub fn new(
        scene: &Scene,
        frozen: &FrozenSet,
        options: &ConstraintOptions,
        key: &NucleotideKey,
    ) -> Result<Self, ConstraintError> {
        require_present(scene, key)?;
        if frozen.contains(key) {
            return Err(ConstraintError::frozen(format!(
                "nucleotide #{} of {} is frozen",
                scene.display_index(key),
                key.molecule_name
            )));
        }
        let is_base_paired = TopologyView::new(scene, options).is_paired(key);
        if is_base_paired {
            warn!(%key, "dragging a base-paired nucleotide on its own");
        }
        Ok(Self {
            members: [key.clone()],
            is_base_paired,
            origin: None,
        })
    }

    /// Dragging is allowed either way; callers may warn when this is set.
    pub fn is_base_paired(&self) -> bool {
        self.is_base_paired
    }
}

impl InteractionConstraint for SingleNucleotideConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::SingleNucleotide
    }

    fn member_keys(&self) -> &[NucleotideKey] {
        &self.members
    }

    fn initiate_drag(&mut self, scene: &Scene) -> Vector2D {
        let origin = scene.position(&self.members[0]).unwrap_or(Vector2D::ZERO);
        self.origin = Some(origin);
        origin
    }

    fn continue_drag(
        &mut self,
        scene: &mut Scene,
        total_drag: Vector2D,
        _reposition_annotations: bool,
    ) -> RerenderBatch {
        let origin = match self.origin {
            Some(origin) => origin,
            None => self.initiate_drag(scene),
        };
        let mut batch = RerenderBatch::new();
        let key = &self.members[0];
        if scene.set_position(key, origin + total_drag) {
            batch.add_nucleotide(scene, key);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintErrorKind;
    use crate::topology::test_support::{key, scene};

    #[test]
    fn test_drag_sets_position_directly() {
        let mut scene = scene("(.)");
        let mut c =
            SingleNucleotideConstraint::new(&scene, &FrozenSet::new(), &ConstraintOptions::default(), &key(1))
                .unwrap();
        assert!(!c.is_base_paired());
        let start = c.initiate_drag(&scene);
        let batch = c.continue_drag(&mut scene, Vector2D::new(1.0, 2.0), false);
        assert_eq!(scene.position(&key(1)), Some(start + Vector2D::new(1.0, 2.0)));
        assert_eq!(batch.nucleotides.len(), 1);
        assert!(batch.base_pairs.is_empty());
    }

    #[test]
    fn test_paired_is_flagged_and_frozen_rejected() {
        let scene = scene("(.)");
        let options = ConstraintOptions::default();
        let c = SingleNucleotideConstraint::new(&scene, &FrozenSet::new(), &options, &key(0)).unwrap();
        assert!(c.is_base_paired());

        let frozen: FrozenSet = [key(0)].into_iter().collect();
        let err = SingleNucleotideConstraint::new(&scene, &frozen, &options, &key(0)).unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::FrozenNucleotide);
        let err = SingleNucleotideConstraint::new(&scene, &frozen, &options, &key(9)).unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::NucleotideNotFound);
    }
}
