//! Scripted edit sessions: build one constraint and run a list of operations on it.
//!
//! This is the shared entry point of the command-line and wasm drivers.

use crate::constraints::{ConstraintHandle, ConstraintKind, ConstraintRequest, Orientation};
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{BasePairType, Color, Font, FrozenSet, NucleotideKey, Scene};
use crate::vector2d::Vector2D;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EditRequest {
    pub constraint: ConstraintRequest,
    #[serde(default)]
    pub options: ConstraintOptions,
    #[serde(default)]
    pub frozen: FrozenSet,
    #[serde(default)]
    pub operations: Vec<EditOperation>,
}

/// One step of an edit session.
///
/// Each `Drag` is a complete gesture: the members are snapshotted, then moved
/// as if the pointer travelled by `(x, y)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    Drag {
        x: f64,
        y: f64,
        #[serde(default)]
        reposition_annotations: bool,
    },
    SetRadius {
        radius: f64,
    },
    Normalize,
    SetOrientation {
        orientation: Orientation,
        #[serde(default)]
        displacement_along_normal: f64,
    },
    Flip,
    BroadcastColor {
        color: Color,
    },
    BroadcastFont {
        font: Font,
    },
    SetBasePairType {
        base_pair_type: BasePairType,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct EditOutcome {
    pub kind: ConstraintKind,
    pub member_keys: Vec<NucleotideKey>,
    /// Union of the batches of every operation.
    pub batch: RerenderBatch,
}

impl EditOperation {
    fn apply(
        &self,
        handle: &mut ConstraintHandle,
        scene: &mut Scene,
    ) -> Result<RerenderBatch, ConstraintError> {
        match self {
            EditOperation::Drag {
                x,
                y,
                reposition_annotations,
            } => {
                handle.initiate_drag(scene);
                Ok(handle.continue_drag(scene, Vector2D::new(*x, *y), *reposition_annotations))
            }
            EditOperation::SetRadius { radius } => handle.set_radius(scene, *radius),
            EditOperation::Normalize => handle.normalize(scene),
            EditOperation::SetOrientation {
                orientation,
                displacement_along_normal,
            } => handle.set_orientation(scene, *orientation, *displacement_along_normal),
            EditOperation::Flip => handle.flip(scene),
            EditOperation::BroadcastColor { color } => Ok(handle.broadcast_color(scene, *color)),
            EditOperation::BroadcastFont { font } => Ok(handle.broadcast_font(scene, font)),
            EditOperation::SetBasePairType { base_pair_type } => {
                handle.set_base_pair_type(scene, *base_pair_type)
            }
        }
    }
}

/// Run `request` against `scene`.
///
/// Operations run on a copy that replaces `scene` only when every one of them
/// succeeds, so a failed session leaves the scene untouched.
#[instrument(skip_all, fields(kind = %request.constraint.kind(), operations = request.operations.len()))]
pub fn apply_edit(scene: &mut Scene, request: &EditRequest) -> Result<EditOutcome, ConstraintError> {
    let mut working = scene.clone();
    let mut handle = ConstraintHandle::new(
        &working,
        &request.frozen,
        &request.options,
        &request.constraint,
    )?;

    let mut batch = RerenderBatch::new();
    for (step, operation) in request.operations.iter().enumerate() {
        let done = operation.apply(&mut handle, &mut working)?;
        debug!(step, changed = done.nucleotides.len(), "operation applied");
        batch.merge(done);
    }

    *scene = working;
    Ok(EditOutcome {
        kind: handle.kind(),
        member_keys: handle.member_keys().to_vec(),
        batch,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConstraintErrorKind;
    use crate::topology::test_support::{key, scene};

    #[test]
    fn test_request_defaults() {
        let request: EditRequest = serde_json::from_str(
            r#"{"constraint": {"kind": "rna_helix", "key": {"complex_index": 0, "molecule_name": "strand0", "nucleotide_index": 1}}}"#,
        )
        .unwrap();
        assert_eq!(request.options, ConstraintOptions::default());
        assert!(request.frozen.is_empty());
        assert!(request.operations.is_empty());
        assert_eq!(
            request.constraint,
            ConstraintRequest::RnaHelix {
                key: key(1),
                partner: None
            }
        );
    }

    #[test]
    fn test_drag_session() {
        let mut scene = scene(".((...)).");
        let before = scene.position(&key(4)).unwrap();
        let request = EditRequest {
            constraint: ConstraintRequest::RnaHelix {
                key: key(2),
                partner: None,
            },
            options: ConstraintOptions::default(),
            frozen: FrozenSet::new(),
            operations: vec![
                EditOperation::Drag {
                    x: 1.0,
                    y: 0.0,
                    reposition_annotations: false,
                },
                EditOperation::Drag {
                    x: 0.0,
                    y: 2.0,
                    reposition_annotations: false,
                },
            ],
        };
        let outcome = apply_edit(&mut scene, &request).unwrap();
        assert_eq!(outcome.kind, ConstraintKind::RnaHelix);
        assert_eq!(outcome.member_keys.len(), 7);
        assert_eq!(outcome.batch.base_pairs.len(), 2);
        let moved = scene.position(&key(4)).unwrap() - before;
        assert!((moved.x - 1.0).abs() < 1e-9 && (moved.y - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_failed_operation_leaves_scene_untouched() {
        let mut scene = scene("((....))");
        let original = scene.clone();
        let request = EditRequest {
            constraint: ConstraintRequest::RnaHelix {
                key: key(0),
                partner: None,
            },
            options: ConstraintOptions::default(),
            frozen: FrozenSet::new(),
            operations: vec![
                EditOperation::Drag {
                    x: 5.0,
                    y: 5.0,
                    reposition_annotations: false,
                },
                EditOperation::SetRadius { radius: 2.0 },
            ],
        };
        let err = apply_edit(&mut scene, &request).unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::UnsupportedOperation);
        assert_eq!(scene, original);
    }
}
