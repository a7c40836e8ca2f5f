use crate::geometry::{distribute_on_arc, Circle};
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{FrozenSet, NucleotideKey, Scene};
use crate::vector2d::Vector2D;

// ── Linear drag ─────────────────────────────────────────────────────

/// Rigid translation of a member set.
///
/// Offsets from the anchor are captured once; every update places each member
/// at `anchor + offset`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearDrag {
    anchor: Vector2D,
    deltas: Vec<(NucleotideKey, Vector2D)>,
}

impl LinearDrag {
    /// Members absent from the scene are dropped.
    pub fn new<'k>(
        scene: &Scene,
        anchor: Vector2D,
        members: impl IntoIterator<Item = &'k NucleotideKey>,
    ) -> Self {
        let deltas = members
            .into_iter()
            .filter_map(|key| scene.position(key).map(|p| (key.clone(), p - anchor)))
            .collect();
        Self { anchor, deltas }
    }

    pub fn anchor(&self) -> Vector2D {
        self.anchor
    }

    pub fn update(&self, scene: &mut Scene, anchor: Vector2D, batch: &mut RerenderBatch) {
        for (key, delta) in &self.deltas {
            if scene.set_position(key, anchor + *delta) {
                batch.add_nucleotide(scene, key);
            }
        }
    }
}

// ── Interpolation drag ──────────────────────────────────────────────

/// Redistributes a strand at equal spacing between a fixed point and the
/// dragged reference member.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationDrag {
    fixed: Vector2D,
    /// Ordered from the fixed end; the flag marks members allowed to move.
    members: Vec<(NucleotideKey, bool)>,
    reference: usize,
}

impl InterpolationDrag {
    pub fn new(
        fixed: Vector2D,
        members: Vec<NucleotideKey>,
        reference: usize,
        frozen: &FrozenSet,
    ) -> Self {
        let members = members
            .into_iter()
            .map(|key| {
                let movable = !frozen.contains(&key);
                (key, movable)
            })
            .collect();
        Self {
            fixed,
            members,
            reference,
        }
    }

    pub fn fixed(&self) -> Vector2D {
        self.fixed
    }

    /// Member `j` goes to `fixed + (anchor - fixed)·(j+1)/(reference+1)`.
    pub fn update(&self, scene: &mut Scene, anchor: Vector2D, batch: &mut RerenderBatch) {
        let step = (anchor - self.fixed) / (self.reference as f64 + 1.0);
        for (j, (key, movable)) in self.members.iter().enumerate() {
            if !movable {
                continue;
            }
            if scene.set_position(key, self.fixed + step * (j as f64 + 1.0)) {
                batch.add_nucleotide(scene, key);
            }
        }
    }

    pub fn movable_keys(&self) -> impl Iterator<Item = &NucleotideKey> {
        self.members.iter().filter(|(_, m)| *m).map(|(k, _)| k)
    }
}

// ── Arc placement ───────────────────────────────────────────────────

/// Place `members` strictly inside the arc of `circle` starting at
/// `start_angle` and sweeping `span`, at equal angular steps.
///
/// Frozen members keep their position but still take up their slot.
pub fn place_on_arc(
    scene: &mut Scene,
    members: &[NucleotideKey],
    frozen: &FrozenSet,
    circle: Circle,
    start_angle: f64,
    span: f64,
    batch: &mut RerenderBatch,
) {
    let targets = distribute_on_arc(circle, start_angle, span, members.len());
    place(scene, members, frozen, &targets, batch);
}

/// Move each non-frozen member to the matching target.
pub fn place(
    scene: &mut Scene,
    members: &[NucleotideKey],
    frozen: &FrozenSet,
    targets: &[Vector2D],
    batch: &mut RerenderBatch,
) {
    for (key, &target) in members.iter().zip(targets) {
        if frozen.contains(key) {
            continue;
        }
        if scene.set_position(key, target) {
            batch.add_nucleotide(scene, key);
        }
    }
}
