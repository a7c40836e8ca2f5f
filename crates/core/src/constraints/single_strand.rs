use super::{require_movable, require_present, ConstraintKind, InteractionConstraint};
use crate::annotation::AnnotationSnapshot;
use crate::drag::{place, place_on_arc, InterpolationDrag, LinearDrag};
use crate::error::ConstraintError;
use crate::geometry::{
    arc_span, arc_span_through, bounding_circle, distribute_on_arc, distribute_on_segment,
    reflect_across_line, Circle,
};
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{FrozenSet, NucleotideKey, Scene};
use crate::topology::{find_single_strand, SingleStrand, StrandBoundary, TopologyView};
use crate::vector2d::{distance, midpoint, normalize, orthogonalize_left, Vector2D, EPSILON};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Clockwise,
    Counterclockwise,
    Straight,
}

/// Drag geometry, chosen by how many ends of the strand are anchored.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrandStrategy {
    /// Neither end anchored.
    Linear,
    /// One end anchored.
    Interpolation,
    /// Both ends anchored.
    Arc,
}

#[derive(Debug, Clone)]
enum StrandDrag {
    Linear(LinearDrag),
    Interpolation {
        drag: InterpolationDrag,
        anchor: Vector2D,
        labels: AnnotationSnapshot,
    },
    Arc {
        anchor: Vector2D,
        start: Vector2D,
        end: Vector2D,
        center: Vector2D,
        positions: Vec<Vector2D>,
        labels: AnnotationSnapshot,
    },
}

/// A run of unpaired residues between two base pairs or molecule ends.
#[derive(Debug, Clone)]
pub struct SingleStrandConstraint {
    strand: SingleStrand,
    grabbed: NucleotideKey,
    /// Frozen members only.
    frozen: FrozenSet,
    strategy: StrandStrategy,
    drag: Option<StrandDrag>,
}

impl SingleStrandConstraint {
    pub fn new(
        scene: &Scene,
        frozen: &FrozenSet,
        options: &ConstraintOptions,
        key: &NucleotideKey,
    ) -> Result<Self, ConstraintError> {
        require_present(scene, key)?;
        let view = TopologyView::new(scene, options);
        let strand = find_single_strand(&view, key, frozen, options.truncate_rna_single_strand_flag)?;
        require_movable(scene, &strand.members, frozen, ConstraintKind::RnaSingleStrand)?;

        let strategy = match strand.anchored_count() {
            0 => StrandStrategy::Linear,
            1 => StrandStrategy::Interpolation,
            _ => StrandStrategy::Arc,
        };
        debug!(members = strand.members.len(), ?strategy, "single strand bounded");

        Ok(Self {
            frozen: strand
                .members
                .iter()
                .filter(|k| frozen.contains(k))
                .cloned()
                .collect(),
            strand,
            grabbed: key.clone(),
            strategy,
            drag: None,
        })
    }

    pub fn strategy(&self) -> StrandStrategy {
        self.strategy
    }

    pub fn strand(&self) -> &SingleStrand {
        &self.strand
    }

    fn movable(&self) -> impl Iterator<Item = &NucleotideKey> {
        self.strand
            .members
            .iter()
            .filter(|k| !self.frozen.contains(k))
    }

    /// Both boundary points, failing when they coincide.
    fn boundary_points(&self, scene: &Scene) -> Result<(Vector2D, Vector2D), ConstraintError> {
        let (Some(p0), Some(p1)) = (self.strand.lower_point(scene), self.strand.upper_point(scene))
        else {
            return Err(ConstraintError::degenerate(
                "single strand boundary is missing from the scene",
            ));
        };
        if distance(p0, p1) < EPSILON {
            return Err(ConstraintError::degenerate(
                "single strand boundary points coincide",
            ));
        }
        Ok((p0, p1))
    }

    /// Members placed by orientation edits: free terminal members stay put.
    fn placed_members(&self) -> &[NucleotideKey] {
        let members = &self.strand.members[..];
        let lo = usize::from(self.strand.lower == StrandBoundary::Free);
        let hi = members.len() - usize::from(self.strand.upper == StrandBoundary::Free);
        if lo >= hi {
            &[]
        } else {
            &members[lo..hi]
        }
    }

    /// Lay the strand out analytically between its boundary points.
    ///
    /// `Straight` spaces the members evenly on the chord. The angular modes put
    /// them on a circle whose center sits `displacement_along_normal` off the
    /// chord midpoint along its left normal, traversed in the requested sense.
    pub fn set_orientation(
        &mut self,
        scene: &mut Scene,
        orientation: Orientation,
        displacement_along_normal: f64,
    ) -> Result<RerenderBatch, ConstraintError> {
        let (p0, p1) = self.boundary_points(scene)?;
        if !displacement_along_normal.is_finite() {
            return Err(ConstraintError::degenerate(format!(
                "displacement {displacement_along_normal} is not finite"
            )));
        }
        let members = self.placed_members().to_vec();
        let targets = match orientation {
            Orientation::Straight => distribute_on_segment(p0, p1, members.len()),
            Orientation::Clockwise | Orientation::Counterclockwise => {
                let center = midpoint(p0, p1)
                    + normalize(orthogonalize_left(p1 - p0)) * displacement_along_normal;
                let circle = Circle {
                    center,
                    radius: distance(p0, center),
                };
                let span = arc_span(
                    center,
                    p0,
                    p1,
                    orientation == Orientation::Counterclockwise,
                );
                distribute_on_arc(circle, (p0 - center).angle(), span, members.len())
            }
        };
        let mut batch = RerenderBatch::new();
        place(scene, &members, &self.frozen, &targets, &mut batch);
        self.drag = None;
        Ok(batch)
    }

    /// Mirror the movable members and their labels across the boundary chord.
    pub fn flip(&mut self, scene: &mut Scene) -> Result<RerenderBatch, ConstraintError> {
        let (p0, p1) = self.boundary_points(scene)?;
        let direction = p1 - p0;
        let movable: Vec<NucleotideKey> = self.movable().cloned().collect();
        let labels = AnnotationSnapshot::capture(scene, &movable);
        let mut batch = RerenderBatch::new();
        for key in &movable {
            let Some(position) = scene.position(key) else {
                continue;
            };
            scene.set_position(key, reflect_across_line(position, p0, direction));
            labels.reflect(scene, key, direction);
            batch.add_nucleotide(scene, key);
        }
        self.drag = None;
        Ok(batch)
    }
}

impl InteractionConstraint for SingleStrandConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::RnaSingleStrand
    }

    fn member_keys(&self) -> &[NucleotideKey] {
        &self.strand.members
    }

    fn initiate_drag(&mut self, scene: &Scene) -> Vector2D {
        let anchor = scene.position(&self.grabbed).unwrap_or(Vector2D::ZERO);
        let labels = AnnotationSnapshot::capture(scene, self.movable());
        let drag = match self.strategy {
            StrandStrategy::Linear => StrandDrag::Linear(LinearDrag::new(scene, anchor, self.movable())),
            StrandStrategy::Interpolation => {
                let mut ordered = self.strand.members.clone();
                let fixed = match &self.strand.lower {
                    StrandBoundary::Anchored { .. } => self.strand.lower_point(scene),
                    StrandBoundary::Free => {
                        ordered.reverse();
                        self.strand.upper_point(scene)
                    }
                };
                let reference = ordered
                    .iter()
                    .position(|k| *k == self.grabbed)
                    .unwrap_or(0);
                StrandDrag::Interpolation {
                    drag: InterpolationDrag::new(
                        fixed.unwrap_or(anchor),
                        ordered,
                        reference,
                        &self.frozen,
                    ),
                    anchor,
                    labels,
                }
            }
            StrandStrategy::Arc => {
                let start = self.strand.lower_point(scene).unwrap_or(anchor);
                let end = self.strand.upper_point(scene).unwrap_or(anchor);
                StrandDrag::Arc {
                    anchor,
                    start,
                    end,
                    center: bounding_circle(anchor, start, end).center,
                    positions: self
                        .strand
                        .members
                        .iter()
                        .map(|k| scene.position(k).unwrap_or(anchor))
                        .collect(),
                    labels,
                }
            }
        };
        self.drag = Some(drag);
        anchor
    }

    fn continue_drag(
        &mut self,
        scene: &mut Scene,
        total_drag: Vector2D,
        reposition_annotations: bool,
    ) -> RerenderBatch {
        if self.drag.is_none() {
            self.initiate_drag(scene);
        }
        let mut batch = RerenderBatch::new();
        let Some(drag) = &self.drag else {
            return batch;
        };

        match drag {
            StrandDrag::Linear(linear) => {
                linear.update(scene, linear.anchor() + total_drag, &mut batch);
            }
            StrandDrag::Interpolation {
                drag,
                anchor,
                labels,
            } => {
                let target = *anchor + total_drag;
                drag.update(scene, target, &mut batch);
                if reposition_annotations {
                    let turn = (target - drag.fixed()).angle() - (*anchor - drag.fixed()).angle();
                    for key in drag.movable_keys() {
                        labels.rotate(scene, key, turn);
                    }
                }
            }
            StrandDrag::Arc {
                anchor,
                start,
                end,
                center,
                positions,
                labels,
            } => {
                let target = *anchor + total_drag;
                let circle = bounding_circle(target, *start, *end);
                let span = arc_span_through(circle.center, *start, *end, target);
                place_on_arc(
                    scene,
                    &self.strand.members,
                    &self.frozen,
                    circle,
                    (*start - circle.center).angle(),
                    span,
                    &mut batch,
                );
                if reposition_annotations {
                    for (key, old) in self.strand.members.iter().zip(positions) {
                        if self.frozen.contains(key) {
                            continue;
                        }
                        let Some(new) = scene.position(key) else {
                            continue;
                        };
                        let turn = (new - circle.center).angle() - (*old - *center).angle();
                        labels.rotate(scene, key, turn);
                    }
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure_graph::LabelLine;
    use crate::topology::test_support::{attach_label, key, label_turned, scene};

    fn compare_f64(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() < tolerance
    }

    fn build(scene: &Scene, start: i64) -> SingleStrandConstraint {
        SingleStrandConstraint::new(
            scene,
            &FrozenSet::new(),
            &ConstraintOptions::default(),
            &key(start),
        )
        .unwrap()
    }

    #[test]
    fn test_strategy_follows_anchoring() {
        assert_eq!(build(&scene("...."), 1).strategy(), StrandStrategy::Linear);
        assert_eq!(
            build(&scene("..((...))"), 0).strategy(),
            StrandStrategy::Interpolation
        );
        assert_eq!(build(&scene("((..))"), 2).strategy(), StrandStrategy::Arc);
    }

    #[test]
    fn test_interpolation_puts_grabbed_member_under_pointer() {
        let mut scene = scene("..((...))");
        let mut c = build(&scene, 0);
        let anchor = c.initiate_drag(&scene);
        let total = Vector2D::new(-2.0, 1.0);
        c.continue_drag(&mut scene, total, false);
        let grabbed = scene.position(&key(0)).unwrap();
        assert!(compare_f64(grabbed.x, anchor.x + total.x, 1e-9));
        assert!(compare_f64(grabbed.y, anchor.y + total.y, 1e-9));
        let fixed = scene.position(&key(2)).unwrap();
        let middle = scene.position(&key(1)).unwrap();
        let expected = midpoint(fixed, grabbed);
        assert!(compare_f64(middle.x, expected.x, 1e-9));
        assert!(compare_f64(middle.y, expected.y, 1e-9));
    }

    #[test]
    fn test_arc_drag_keeps_members_on_circle() {
        let mut scene = scene("((....))");
        let mut c = build(&scene, 3);
        let anchor = c.initiate_drag(&scene);
        c.continue_drag(&mut scene, Vector2D::new(0.5, 0.5), true);
        let p0 = scene.position(&key(1)).unwrap();
        let p1 = scene.position(&key(6)).unwrap();
        let circle = bounding_circle(anchor + Vector2D::new(0.5, 0.5), p0, p1);
        for i in 2..6 {
            let p = scene.position(&key(i)).unwrap();
            assert!(compare_f64(distance(p, circle.center), circle.radius, 1e-9));
        }
    }

    #[test]
    fn test_straight_orientation() {
        let mut scene = scene("((..))");
        let mut c = build(&scene, 3);
        c.set_orientation(&mut scene, Orientation::Straight, 0.0)
            .unwrap();
        let p0 = scene.position(&key(1)).unwrap();
        let p1 = scene.position(&key(4)).unwrap();
        let first = scene.position(&key(2)).unwrap();
        let expected = p0 + (p1 - p0) / 3.0;
        assert!(compare_f64(first.x, expected.x, 1e-9));
        assert!(compare_f64(first.y, expected.y, 1e-9));
    }

    #[test]
    fn test_clockwise_orientation_on_semicircle() {
        let mut scene = scene("((...))");
        let mut c = build(&scene, 3);
        c.set_orientation(&mut scene, Orientation::Clockwise, 0.0)
            .unwrap();
        let p0 = scene.position(&key(1)).unwrap();
        let p1 = scene.position(&key(5)).unwrap();
        let center = midpoint(p0, p1);
        for i in 2..5 {
            let p = scene.position(&key(i)).unwrap();
            assert!(compare_f64(distance(p, center), distance(p0, center), 1e-9));
        }
        // Turning clockwise from p0 to p1 passes left of the directed chord.
        let m = scene.position(&key(3)).unwrap();
        assert!(crate::vector2d::cross(p1 - p0, m - p0) > 0.0);
    }

    #[test]
    fn test_flip_twice_restores_layout() {
        let mut scene = scene("((...))");
        scene.get_nucleotide_mut(&key(3)).unwrap().label_line = Some(LabelLine {
            points: vec![Vector2D::new(0.0, 1.0)],
        });
        let original = scene.clone();
        let mut c = build(&scene, 3);
        c.flip(&mut scene).unwrap();
        assert_ne!(scene, original);
        c.flip(&mut scene).unwrap();
        for i in 2..5 {
            let a = scene.position(&key(i)).unwrap();
            let b = original.position(&key(i)).unwrap();
            assert!(compare_f64(a.x, b.x, 1e-9) && compare_f64(a.y, b.y, 1e-9));
        }
    }

    #[test]
    fn test_degenerate_boundary() {
        let mut scene = scene("((..))");
        let p0 = scene.position(&key(1)).unwrap();
        scene.set_position(&key(4), p0);
        let mut c = build(&scene, 2);
        let err = c
            .set_orientation(&mut scene, Orientation::Counterclockwise, 1.0)
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ConstraintErrorKind::DegenerateGeometry);
    }

    #[test]
    fn test_arc_drag_turns_labels_around_the_new_center() {
        let mut scene = scene("((....))");
        for i in 2..6 {
            attach_label(&mut scene, &key(i), Vector2D::new(-1.0, 0.5));
        }
        let before = scene.clone();
        let mut c = build(&scene, 3);
        let anchor = c.initiate_drag(&scene);
        let (p0, p1) = (scene.position(&key(1)).unwrap(), scene.position(&key(6)).unwrap());
        let old_center = bounding_circle(anchor, p0, p1).center;
        let total = Vector2D::new(0.5, 0.5);
        c.continue_drag(&mut scene, total, true);

        let new_center = bounding_circle(anchor + total, p0, p1).center;
        for i in 2..6 {
            let old = before.position(&key(i)).unwrap();
            let new = scene.position(&key(i)).unwrap();
            let turn = (new - new_center).angle() - (old - old_center).angle();
            assert!(label_turned(&before, &scene, &key(i), turn));
        }

        let after_first = scene.clone();
        c.continue_drag(&mut scene, total, true);
        assert_eq!(scene, after_first);
    }

    #[test]
    fn test_interpolation_drag_turns_labels_about_the_fixed_end() {
        let mut scene = scene("..((...))");
        attach_label(&mut scene, &key(0), Vector2D::new(0.0, 1.0));
        attach_label(&mut scene, &key(1), Vector2D::new(1.0, 1.0));
        let before = scene.clone();
        let mut c = build(&scene, 0);
        let anchor = c.initiate_drag(&scene);
        let total = Vector2D::new(-2.0, 1.0);
        c.continue_drag(&mut scene, total, true);

        let fixed = scene.position(&key(2)).unwrap();
        let turn = (anchor + total - fixed).angle() - (anchor - fixed).angle();
        assert!(label_turned(&before, &scene, &key(0), turn));
        assert!(label_turned(&before, &scene, &key(1), turn));

        let after_first = scene.clone();
        c.continue_drag(&mut scene, total, true);
        assert_eq!(scene, after_first);

        c.continue_drag(&mut scene, Vector2D::ZERO, true);
        assert!(label_turned(&before, &scene, &key(0), 0.0));
    }
}
