use wasm_bindgen::prelude::*;

/// Run an edit request against a scene.
///
/// Both arguments and the result are JSON: `{"scene", "outcome"}` on success,
/// `{"error": {"kind", "message"}}` otherwise. The request's `options` and
/// `frozen` fields may be omitted.
#[wasm_bindgen]
pub fn apply_edit(scene_json: &str, request_json: &str) -> String {
    rnaedit_core::apply_edit_json(scene_json, request_json)
}

/// Build a scene from dot-bracket-plus notation and return it as JSON.
///
/// An empty `seq` leaves every residue symbol as `N`.
#[wasm_bindgen]
pub fn scene_from_dot_bracket(structure: &str, seq: &str) -> String {
    let seq = if seq.is_empty() { None } else { Some(seq) };
    rnaedit_core::scene_from_dot_bracket_json(structure, seq)
}

/// Default constraint options as JSON, for UIs that edit them.
#[wasm_bindgen]
pub fn default_options() -> String {
    serde_json::to_string(&rnaedit_core::ConstraintOptions::default()).unwrap_or_default()
}
