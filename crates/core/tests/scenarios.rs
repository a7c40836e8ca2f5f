use proptest::prelude::*;
use rnaedit_core::constraints::{ConstraintHandle, ConstraintRequest, SingleStrandConstraint, StrandStrategy};
use rnaedit_core::geometry::bounding_circle;
use rnaedit_core::vector2d::{distance, normalize_angle};
use rnaedit_core::{
    apply_edit_json, scene_from_dot_bracket, ConstraintErrorKind, ConstraintKind,
    ConstraintOptions, FrozenSet, NucleotideKey, Scene, Vector2D,
};
use std::f64::consts::PI;

fn compare_f64(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

fn key(index: i64) -> NucleotideKey {
    NucleotideKey::new(0, "strand0", index)
}

fn scene(structure: &str) -> Scene {
    scene_from_dot_bracket(structure, None).expect("valid structure")
}

fn handle(scene: &Scene, frozen: &FrozenSet, request: ConstraintRequest) -> ConstraintHandle {
    ConstraintHandle::new(scene, frozen, &ConstraintOptions::default(), &request)
        .expect("constraint builds")
}

fn indices(keys: &[NucleotideKey]) -> Vec<i64> {
    keys.iter().map(|k| k.nucleotide_index).collect()
}

// ── Hairpin ──────────────────────────────────────────────────────────

#[test]
fn test_hairpin_pair_and_loop() {
    let scene = scene("((..))");

    let pair = handle(&scene, &FrozenSet::new(), ConstraintRequest::SingleBasePair {
        key: key(0),
        partner: None,
    });
    assert_eq!(pair.kind(), ConstraintKind::SingleBasePair);
    assert_eq!(indices(pair.member_keys()), vec![0, 1, 2, 3, 4, 5]);

    let strand = SingleStrandConstraint::new(
        &scene,
        &FrozenSet::new(),
        &ConstraintOptions::default(),
        &key(2),
    )
    .unwrap();
    assert_eq!(indices(&strand.strand().members), vec![2, 3]);
    assert!(strand.strand().lower.is_anchored());
    assert!(strand.strand().upper.is_anchored());
    assert_eq!(strand.strategy(), StrandStrategy::Arc);
}

// ── Cycle closure ────────────────────────────────────────────────────

#[test]
fn test_cycle_layout_winds_once() {
    let mut scene = scene("..((..((....))..((...))..))..");
    let mut cycle = handle(&scene, &FrozenSet::new(), ConstraintRequest::RnaCycle { key: key(4) });
    cycle.set_radius(&mut scene, 5.0).unwrap();

    let members = cycle.member_keys().to_vec();
    let p = |k: &NucleotideKey| scene.position(k).unwrap();
    let circle = bounding_circle(p(&members[0]), p(&members[1]), p(&members[members.len() - 1]));
    assert!(compare_f64(circle.radius, 5.0, 1e-9));

    let winding: f64 = (0..members.len())
        .map(|i| {
            let a = (p(&members[i]) - circle.center).angle();
            let b = (p(&members[(i + 1) % members.len()]) - circle.center).angle();
            let d = normalize_angle(b - a);
            if d > PI {
                d - 2.0 * PI
            } else {
                d
            }
        })
        .sum();
    assert!(compare_f64(winding.abs(), 2.0 * PI, 1e-9));
}

// ── Linear drags ─────────────────────────────────────────────────────

#[test]
fn test_repeated_drag_is_idempotent() {
    let mut scene = scene(".((..((...))..)).");
    let original = scene.clone();
    let mut helix = handle(&scene, &FrozenSet::new(), ConstraintRequest::RnaStackedHelix {
        key: key(1),
        partner: None,
    });
    helix.initiate_drag(&scene);
    let total = Vector2D::new(-2.5, 4.0);
    let first = helix.continue_drag(&mut scene, total, false);
    let after_first = scene.clone();
    let second = helix.continue_drag(&mut scene, total, false);
    assert_eq!(scene, after_first);
    assert_eq!(first, second);

    helix.continue_drag(&mut scene, Vector2D::ZERO, false);
    for k in original.keys() {
        let (a, b) = (scene.position(&k).unwrap(), original.position(&k).unwrap());
        assert!(compare_f64(a.x, b.x, 1e-12) && compare_f64(a.y, b.y, 1e-12));
    }
}

#[test]
fn test_frozen_members_stay_put() {
    let mut scene = scene("..((.((...)).))..");
    let frozen: FrozenSet = [key(8)].into_iter().collect();
    let mut subdomain = handle(&scene, &frozen, ConstraintRequest::RnaSubDomain {
        key: key(3),
        partner: None,
    });
    let frozen_before = scene.position(&key(8));
    let moved_before = scene.position(&key(7)).unwrap();
    subdomain.initiate_drag(&scene);
    let batch = subdomain.continue_drag(&mut scene, Vector2D::new(1.0, 1.0), false);

    assert_eq!(scene.position(&key(8)), frozen_before);
    assert!(!batch.nucleotides.contains(&key(8)));
    let moved = scene.position(&key(7)).unwrap() - moved_before;
    assert!(compare_f64(moved.x, 1.0, 1e-9) && compare_f64(moved.y, 1.0, 1e-9));
}

#[test]
fn test_fully_frozen_selection_is_rejected() {
    let scene = scene("((..))");
    let frozen: FrozenSet = scene.keys().collect();
    let err = ConstraintHandle::new(
        &scene,
        &frozen,
        &ConstraintOptions::default(),
        &ConstraintRequest::RnaMolecule { key: key(0) },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ConstraintErrorKind::FrozenNucleotide);
}

// ── Simultaneous base pairs ──────────────────────────────────────────

#[test]
fn test_ambiguous_pair_needs_partner() {
    let mut scene = scene("((....))");
    scene
        .complex_mut(0)
        .unwrap()
        .add_base_pair("strand0", 0, "strand0", 4, None);

    let err = ConstraintHandle::new(
        &scene,
        &FrozenSet::new(),
        &ConstraintOptions::default(),
        &ConstraintRequest::SingleBasePair {
            key: key(0),
            partner: None,
        },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ConstraintErrorKind::MultipleBasePairsNucleotide);

    let pair = handle(&scene, &FrozenSet::new(), ConstraintRequest::SingleBasePair {
        key: key(0),
        partner: Some(key(7)),
    });
    // The extra pair breaks the hairpin, so its loop stays behind.
    assert_eq!(indices(pair.member_keys()), vec![0, 7]);
}

#[test]
fn test_helix_kinds_need_partner_when_ambiguous() {
    let mut scene = scene("((....))");
    scene
        .complex_mut(0)
        .unwrap()
        .add_base_pair("strand0", 1, "strand0", 3, None);

    let requests = |partner: Option<NucleotideKey>| {
        [
            ConstraintRequest::RnaHelix {
                key: key(1),
                partner: partner.clone(),
            },
            ConstraintRequest::RnaStackedHelix {
                key: key(1),
                partner: partner.clone(),
            },
            ConstraintRequest::RnaSubDomain {
                key: key(1),
                partner,
            },
        ]
    };
    for request in requests(None) {
        let err = ConstraintHandle::new(
            &scene,
            &FrozenSet::new(),
            &ConstraintOptions::default(),
            &request,
        )
        .unwrap_err();
        assert_eq!(err.kind(), ConstraintErrorKind::MultipleBasePairsNucleotide, "{request:?}");
    }

    let [helix, stacked, subdomain] = requests(Some(key(6)))
        .map(|request| handle(&scene, &FrozenSet::new(), request));
    // The second pair breaks the hairpin, so its loop stays behind.
    assert_eq!(indices(helix.member_keys()), vec![0, 1, 6, 7]);
    assert_eq!(indices(stacked.member_keys()), vec![0, 1, 6, 7]);
    assert_eq!(indices(subdomain.member_keys()), (0..8).collect::<Vec<_>>());
}

// ── JSON entry point ─────────────────────────────────────────────────

#[test]
fn test_json_session_round_trip() {
    let original = scene("(((.....)))");
    let scene_json = serde_json::to_string(&original).unwrap();
    let request = r#"{
        "constraint": {"kind": "rna_cycle", "key": {"complex_index": 0, "molecule_name": "strand0", "nucleotide_index": 5}},
        "operations": [{"op": "normalize"}, {"op": "broadcast_color", "color": {"red": 10, "green": 20, "blue": 30}}]
    }"#;

    let output: serde_json::Value = serde_json::from_str(&apply_edit_json(&scene_json, request)).unwrap();
    assert_eq!(output["outcome"]["kind"], "rna_cycle");
    assert_eq!(output["outcome"]["member_keys"].as_array().unwrap().len(), 7);

    let edited: Scene = serde_json::from_value(output["scene"].clone()).unwrap();
    let color = edited.get_nucleotide(&key(5)).unwrap().color.unwrap();
    assert_eq!((color.red, color.green, color.blue), (10, 20, 30));
    assert!(edited.get_nucleotide(&key(0)).unwrap().color.is_none());
    let (a, b) = (edited.position(&key(0)).unwrap(), original.position(&key(0)).unwrap());
    assert!(compare_f64(a.x, b.x, 1e-12) && compare_f64(a.y, b.y, 1e-12));

    let chords: Vec<f64> = (2..8)
        .map(|i| distance(edited.position(&key(i)).unwrap(), edited.position(&key(i + 1)).unwrap()))
        .collect();
    for chord in &chords {
        assert!(compare_f64(*chord, chords[0], 1e-6));
    }
}

proptest! {
    #[test]
    fn prop_helix_drag_is_rigid(dx in -50.0f64..50.0, dy in -50.0f64..50.0) {
        let mut scene = scene("..(((....)))..");
        let mut helix = handle(&scene, &FrozenSet::new(), ConstraintRequest::RnaHelix {
            key: key(3),
            partner: None,
        });
        let members = helix.member_keys().to_vec();
        let before: Vec<Vector2D> = members.iter().map(|k| scene.position(k).unwrap()).collect();
        helix.initiate_drag(&scene);
        helix.continue_drag(&mut scene, Vector2D::new(dx, dy), false);
        for (k, old) in members.iter().zip(&before) {
            let new = scene.position(k).unwrap();
            prop_assert!(compare_f64(new.x - old.x, dx, 1e-9));
            prop_assert!(compare_f64(new.y - old.y, dy, 1e-9));
        }
        prop_assert_eq!(scene.position(&key(0)), scene_from_dot_bracket("..(((....)))..", None).unwrap().position(&key(0)));
    }
}
