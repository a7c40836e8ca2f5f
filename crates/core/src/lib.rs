pub mod annotation;
pub mod constraints;
pub mod drag;
pub mod edit;
pub mod error;
pub mod geometry;
pub mod options;
pub mod parser;
pub mod rerender_batch;
pub mod structure_graph;
pub mod topology;
pub mod vector2d;

pub use constraints::{
    ConstraintHandle, ConstraintKind, ConstraintRequest, InteractionConstraint, Orientation,
};
pub use edit::{apply_edit, EditOperation, EditOutcome, EditRequest};
pub use error::{ConstraintError, ConstraintErrorKind, ErrorReport};
pub use options::ConstraintOptions;
pub use parser::{build_complex, parse_dot_bracket, ParseError};
pub use rerender_batch::RerenderBatch;
pub use structure_graph::{
    BasePairKey, BasePairType, Color, Complex, Font, FrozenSet, Molecule, Nucleotide,
    NucleotideKey, Scene,
};
pub use vector2d::Vector2D;

use serde::Serialize;

/// Name given to the complex of a scene built from dot-bracket notation.
pub const DEFAULT_COMPLEX_NAME: &str = "complex0";

/// A scene holding one complex, at index 0, built from dot-bracket-plus notation.
pub fn scene_from_dot_bracket(structure: &str, sequence: Option<&str>) -> Result<Scene, ParseError> {
    let mut scene = Scene::new();
    scene.complexes.insert(
        0,
        Complex::from_dot_bracket(DEFAULT_COMPLEX_NAME, structure, sequence)?,
    );
    Ok(scene)
}

// ── JSON entry points ───────────────────────────────────────────────

#[derive(Serialize)]
struct EditDocument<'a> {
    scene: &'a Scene,
    outcome: &'a EditOutcome,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Failure {
    Constraint(ErrorReport),
    Input { kind: &'static str, message: String },
}

#[derive(Serialize)]
struct FailureDocument {
    error: Failure,
}

fn input_error(message: String) -> String {
    to_json(&FailureDocument {
        error: Failure::Input {
            kind: "InvalidInput",
            message,
        },
    })
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Run an [`EditRequest`] against a scene, both given as JSON.
///
/// Returns `{"scene": ..., "outcome": ...}` on success and
/// `{"error": {"kind": ..., "message": ...}}` otherwise.
pub fn apply_edit_json(scene_json: &str, request_json: &str) -> String {
    let mut scene: Scene = match serde_json::from_str(scene_json) {
        Ok(scene) => scene,
        Err(e) => return input_error(format!("invalid scene: {e}")),
    };
    let request: EditRequest = match serde_json::from_str(request_json) {
        Ok(request) => request,
        Err(e) => return input_error(format!("invalid edit request: {e}")),
    };
    match apply_edit(&mut scene, &request) {
        Ok(outcome) => to_json(&EditDocument {
            scene: &scene,
            outcome: &outcome,
        }),
        Err(e) => to_json(&FailureDocument {
            error: Failure::Constraint(ErrorReport::from(&e)),
        }),
    }
}

/// Scene JSON for dot-bracket-plus notation, or an error document.
pub fn scene_from_dot_bracket_json(structure: &str, sequence: Option<&str>) -> String {
    match scene_from_dot_bracket(structure, sequence) {
        Ok(scene) => to_json(&scene),
        Err(e) => input_error(e.to_string()),
    }
}
