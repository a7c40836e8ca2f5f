use super::{require_movable, require_present, ConstraintKind, InteractionConstraint};
use crate::annotation::AnnotationSnapshot;
use crate::drag::place_on_arc;
use crate::error::ConstraintError;
use crate::geometry::{
    arc_span_through, bounding_circle, centers_for_radius, reflect_across_line, side_of_line,
    solve_loop_radius, Circle,
};
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{FrozenSet, NucleotideKey, Scene};
use crate::topology::{find_cycle, Cycle, TopologyView};
use crate::vector2d::{distance, dot, midpoint, normalize, orthogonalize_left, Vector2D, EPSILON};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Added to half the anchor chord so the layout circle never degenerates.
const MINIMUM_RADIUS_MARGIN: f64 = 1e-6;

/// Residues enclosed by a pair edge of the cycle, moved rigidly with that pair.
#[derive(Debug, Clone, PartialEq)]
struct Branch {
    ends: (NucleotideKey, NucleotideKey),
    keys: Vec<NucleotideKey>,
}

#[derive(Debug, Clone)]
struct CycleDrag {
    anchor: Vector2D,
    center: Vector2D,
    positions: BTreeMap<NucleotideKey, Vector2D>,
    labels: AnnotationSnapshot,
}

/// A closed loop laid out on a circle through its anchor pair.
#[derive(Debug, Clone)]
pub struct CycleConstraint {
    cycle: Cycle,
    grabbed: NucleotideKey,
    branches: Vec<Branch>,
    /// Frozen members and branch residues.
    frozen: FrozenSet,
    drag: Option<CycleDrag>,
}

impl CycleConstraint {
    pub fn new(
        scene: &Scene,
        frozen: &FrozenSet,
        options: &ConstraintOptions,
        key: &NucleotideKey,
    ) -> Result<Self, ConstraintError> {
        require_present(scene, key)?;
        let view = TopologyView::new(scene, options);
        let cycle = find_cycle(&view, key)?;

        let (a0, a1) = (&cycle.anchor.0, &cycle.anchor.1);
        match (scene.position(a0), scene.position(a1)) {
            (Some(p0), Some(p1)) if distance(p0, p1) >= EPSILON => {}
            _ => {
                return Err(ConstraintError::degenerate(format!(
                    "anchor nucleotides #{} and #{} coincide",
                    scene.display_index(a0),
                    scene.display_index(a1)
                )))
            }
        }

        let mut branches: Vec<Branch> = Vec::new();
        for (x, y) in cycle.pair_edges(&view) {
            let is_anchor = (x == a0 && y == a1) || (x == a1 && y == a0);
            if is_anchor {
                continue;
            }
            let keys = if x.same_molecule(y) {
                let lo = x.nucleotide_index.min(y.nucleotide_index);
                let hi = x.nucleotide_index.max(y.nucleotide_index);
                let keys: Vec<NucleotideKey> = ((lo + 1)..hi)
                    .map(|i| x.with_index(i))
                    .filter(|k| scene.contains(k))
                    .collect();
                if keys.iter().any(|k| cycle.members.contains(k)) {
                    continue;
                }
                keys
            } else {
                cross_molecule_branch(&view, &cycle, x, y)?
            };
            if keys.is_empty() {
                continue;
            }
            if let Some(shared) = keys
                .iter()
                .find(|k| branches.iter().any(|b| b.keys.contains(k)))
            {
                return Err(ConstraintError::complex_arrangement(format!(
                    "nucleotide #{} of {} hangs off two base pairs of the cycle",
                    scene.display_index(shared),
                    shared.molecule_name
                )));
            }
            branches.push(Branch {
                ends: (x.clone(), y.clone()),
                keys,
            });
        }
        debug!(
            members = cycle.len(),
            branches = branches.len(),
            anchor = %cycle.anchor.0,
            "cycle found"
        );

        let mut movable: Vec<NucleotideKey> =
            cycle.members[1..cycle.len() - 1].to_vec();
        movable.extend(branches.iter().flat_map(|b| b.keys.iter().cloned()));
        require_movable(scene, &movable, frozen, ConstraintKind::RnaCycle)?;

        let frozen = cycle
            .members
            .iter()
            .chain(branches.iter().flat_map(|b| b.keys.iter()))
            .filter(|k| frozen.contains(k))
            .cloned()
            .collect();

        Ok(Self {
            cycle,
            grabbed: key.clone(),
            branches,
            frozen,
            drag: None,
        })
    }

    pub fn cycle(&self) -> &Cycle {
        &self.cycle
    }

    /// Residues hanging off the cycle that follow it rigidly, in branch order.
    pub fn branch_keys(&self) -> impl Iterator<Item = &NucleotideKey> {
        self.branches.iter().flat_map(|b| b.keys.iter())
    }

    fn interior(&self) -> &[NucleotideKey] {
        &self.cycle.members[1..self.cycle.members.len() - 1]
    }

    fn anchor_points(&self, scene: &Scene) -> Result<(Vector2D, Vector2D), ConstraintError> {
        match (
            scene.position(&self.cycle.anchor.0),
            scene.position(&self.cycle.anchor.1),
        ) {
            (Some(p0), Some(p1)) if distance(p0, p1) >= EPSILON => Ok((p0, p1)),
            _ => Err(ConstraintError::degenerate("cycle anchor nucleotides coincide")),
        }
    }

    /// Half the anchor chord plus a small margin.
    pub fn minimum_radius(&self, scene: &Scene) -> Result<f64, ConstraintError> {
        let (p0, p1) = self.anchor_points(scene)?;
        Ok(distance(p0, p1) / 2.0 + MINIMUM_RADIUS_MARGIN)
    }

    /// Radius of the circle through the anchors and the first interior member.
    pub fn current_radius(&self, scene: &Scene) -> Option<f64> {
        let p0 = scene.position(&self.cycle.anchor.0)?;
        let p1 = scene.position(&self.cycle.anchor.1)?;
        let inner = scene.position(self.interior().first()?)?;
        Some(bounding_circle(p0, inner, p1).radius)
    }

    fn positions(&self, scene: &Scene) -> BTreeMap<NucleotideKey, Vector2D> {
        self.cycle
            .members
            .iter()
            .chain(self.branch_keys())
            .filter_map(|k| scene.position(k).map(|p| (k.clone(), p)))
            .collect()
    }

    /// Place the interior members on `circle` starting at the first anchor and
    /// sweeping `span`, then carry every branch along with its pair edge.
    ///
    /// Branch geometry is taken from `reference`. Returns the rotation applied
    /// to each branch.
    fn layout(
        &self,
        scene: &mut Scene,
        circle: Circle,
        span: f64,
        start: Vector2D,
        reference: &BTreeMap<NucleotideKey, Vector2D>,
        batch: &mut RerenderBatch,
    ) -> Vec<f64> {
        place_on_arc(
            scene,
            self.interior(),
            &self.frozen,
            circle,
            (start - circle.center).angle(),
            span,
            batch,
        );

        let mut turns = Vec::with_capacity(self.branches.len());
        for branch in &self.branches {
            let (x, y) = &branch.ends;
            let (Some(&old_x), Some(&old_y), Some(new_x), Some(new_y)) = (
                reference.get(x),
                reference.get(y),
                scene.position(x),
                scene.position(y),
            ) else {
                turns.push(0.0);
                continue;
            };
            let turn = (new_y - new_x).angle() - (old_y - old_x).angle();
            let old_mid = midpoint(old_x, old_y);
            let new_mid = midpoint(new_x, new_y);
            for key in &branch.keys {
                if self.frozen.contains(key) {
                    continue;
                }
                let Some(&old) = reference.get(key) else {
                    continue;
                };
                if scene.set_position(key, new_mid + (old - old_mid).rotate(turn)) {
                    batch.add_nucleotide(scene, key);
                }
            }
            turns.push(turn);
        }
        turns
    }

    /// Unit normal of the anchor chord pointing toward the interior members.
    fn member_side(&self, scene: &Scene, p0: Vector2D, p1: Vector2D) -> Vector2D {
        let normal = normalize(orthogonalize_left(p1 - p0));
        let points: Vec<Vector2D> = self
            .interior()
            .iter()
            .filter_map(|k| scene.position(k))
            .collect();
        if points.is_empty() {
            return normal;
        }
        let centroid = points.iter().fold(Vector2D::ZERO, |acc, &p| acc + p) / points.len() as f64;
        if side_of_line(p0, p1, centroid) < 0.0 {
            -normal
        } else {
            normal
        }
    }

    /// Lay the cycle out on a circle of `radius` through the anchor pair.
    ///
    /// Radii below [`minimum_radius`](Self::minimum_radius) are raised to it.
    /// The center is taken on the side of the anchor chord the members
    /// currently occupy.
    pub fn set_radius(
        &mut self,
        scene: &mut Scene,
        radius: f64,
    ) -> Result<RerenderBatch, ConstraintError> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ConstraintError::degenerate(format!(
                "radius {radius} is not a positive finite number"
            )));
        }
        let (p0, p1) = self.anchor_points(scene)?;
        let minimum = distance(p0, p1) / 2.0 + MINIMUM_RADIUS_MARGIN;
        let radius = if radius < minimum {
            warn!(radius, minimum, "radius raised to the cycle minimum");
            minimum
        } else {
            radius
        };

        let side = self.member_side(scene, p0, p1);
        let mid = midpoint(p0, p1);
        let (c0, c1) = centers_for_radius(p0, p1, radius)
            .ok_or_else(|| ConstraintError::degenerate("no circle through the anchor pair"))?;
        let center = if dot(c0 - mid, side) >= dot(c1 - mid, side) {
            c0
        } else {
            c1
        };
        let circle = Circle { center, radius };
        let span = arc_span_through(center, p0, p1, center + side * radius);

        let reference = self.positions(scene);
        let mut batch = RerenderBatch::new();
        self.layout(scene, circle, span, p0, &reference, &mut batch);
        self.drag = None;
        Ok(batch)
    }

    /// Pick the radius at which every non-anchor chord equals the mean
    /// backbone spacing of the cycle, then apply it.
    pub fn normalize(&mut self, scene: &mut Scene) -> Result<RerenderBatch, ConstraintError> {
        let (p0, p1) = self.anchor_points(scene)?;
        let members = &self.cycle.members;
        let chords: Vec<(f64, bool)> = members
            .windows(2)
            .filter_map(|w| {
                let backbone = w[0].same_molecule(&w[1])
                    && w[0].nucleotide_index.abs_diff(w[1].nucleotide_index) == 1;
                Some((distance(scene.position(&w[0])?, scene.position(&w[1])?), backbone))
            })
            .collect();
        let backbone: Vec<f64> = chords.iter().filter(|c| c.1).map(|c| c.0).collect();
        let sample: Vec<f64> = if backbone.is_empty() {
            chords.iter().map(|c| c.0).collect()
        } else {
            backbone
        };
        if sample.is_empty() {
            return Err(ConstraintError::degenerate("cycle has no chords to measure"));
        }
        let spacing = sample.iter().sum::<f64>() / sample.len() as f64;

        let minimum = distance(p0, p1) / 2.0 + MINIMUM_RADIUS_MARGIN;
        let radius = solve_loop_radius(spacing, members.len() - 1, distance(p0, p1))
            .unwrap_or(minimum);
        debug!(spacing, radius, "normalized cycle radius");
        self.set_radius(scene, radius)
    }

    /// Mirror the interior members and branches across the anchor chord.
    pub fn flip(&mut self, scene: &mut Scene) -> Result<RerenderBatch, ConstraintError> {
        let (p0, p1) = self.anchor_points(scene)?;
        let direction = p1 - p0;
        let keys: Vec<NucleotideKey> = self
            .interior()
            .iter()
            .chain(self.branch_keys())
            .filter(|k| !self.frozen.contains(k))
            .cloned()
            .collect();
        let labels = AnnotationSnapshot::capture(scene, &keys);
        let mut batch = RerenderBatch::new();
        for key in &keys {
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

impl InteractionConstraint for CycleConstraint {
    fn kind(&self) -> ConstraintKind {
        ConstraintKind::RnaCycle
    }

    /// Cycle members in traversal order, anchor pair first and last.
    fn member_keys(&self) -> &[NucleotideKey] {
        &self.cycle.members
    }

    fn initiate_drag(&mut self, scene: &Scene) -> Vector2D {
        let anchor = scene.position(&self.grabbed).unwrap_or(Vector2D::ZERO);
        let positions = self.positions(scene);
        let center = match self.anchor_points(scene) {
            Ok((p0, p1)) => bounding_circle(anchor, p0, p1).center,
            Err(_) => anchor,
        };
        let labels = AnnotationSnapshot::capture(scene, positions.keys());
        self.drag = Some(CycleDrag {
            anchor,
            center,
            positions,
            labels,
        });
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
        let (Some(drag), Ok((p0, p1))) = (&self.drag, self.anchor_points(scene)) else {
            return batch;
        };
        let target = drag.anchor + total_drag;

        let minimum = distance(p0, p1) / 2.0 + MINIMUM_RADIUS_MARGIN;
        let mut circle = bounding_circle(target, p0, p1);
        if circle.radius < minimum {
            if let Some((c0, c1)) = centers_for_radius(p0, p1, minimum) {
                let center = if distance(c0, target) <= distance(c1, target) {
                    c0
                } else {
                    c1
                };
                circle = Circle {
                    center,
                    radius: minimum,
                };
            }
        }
        let span = arc_span_through(circle.center, p0, p1, target);
        let turns = self.layout(scene, circle, span, p0, &drag.positions, &mut batch);

        if reposition_annotations {
            for key in self.interior() {
                let (Some(old), Some(new)) = (drag.positions.get(key), scene.position(key)) else {
                    continue;
                };
                if self.frozen.contains(key) {
                    continue;
                }
                let turn = (new - circle.center).angle() - (*old - drag.center).angle();
                drag.labels.rotate(scene, key, turn);
            }
            for (branch, turn) in self.branches.iter().zip(turns) {
                for key in branch.keys.iter().filter(|k| !self.frozen.contains(k)) {
                    drag.labels.rotate(scene, key, turn);
                }
            }
        }
        batch
    }
}

/// Residues beyond `end` on its own molecule, walking away from its backbone
/// neighbor in the cycle, up to the molecule end or the next cycle member.
fn tail(
    view: &TopologyView<'_>,
    cycle: &Cycle,
    end: &NucleotideKey,
    partner: &NucleotideKey,
) -> Result<Vec<NucleotideKey>, ConstraintError> {
    let k = cycle.members.len();
    let position = cycle.members.iter().position(|m| m == end);
    let along = position.and_then(|i| {
        [(i + k - 1) % k, (i + 1) % k]
            .into_iter()
            .map(|j| &cycle.members[j])
            .find(|m| *m != partner)
    });
    let direction = match along {
        Some(m) if end.offset(1).as_ref() == Some(m) => -1,
        Some(m) if end.offset(-1).as_ref() == Some(m) => 1,
        _ => {
            return Err(ConstraintError::complex_arrangement(format!(
                "nucleotide #{} of {} joins the cycle through base pairs only",
                view.scene().display_index(end),
                end.molecule_name
            )))
        }
    };

    let mut keys = Vec::new();
    let mut current = end.clone();
    while let Some(next) = current.offset(direction).filter(|n| view.contains(n)) {
        if cycle.members.contains(&next) {
            break;
        }
        keys.push(next.clone());
        current = next;
    }
    Ok(keys)
}

/// The residues carried by a pair edge `(x, y)` joining two molecules: the
/// tails of both strands on the side away from the cycle.
///
/// Fails when a tail residue pairs outside the branch, since the branch
/// could not then move rigidly.
fn cross_molecule_branch(
    view: &TopologyView<'_>,
    cycle: &Cycle,
    x: &NucleotideKey,
    y: &NucleotideKey,
) -> Result<Vec<NucleotideKey>, ConstraintError> {
    let mut keys = tail(view, cycle, x, y)?;
    keys.extend(tail(view, cycle, y, x)?);
    for key in &keys {
        let stray = view
            .partners(key)
            .into_iter()
            .find(|p| p != x && p != y && !keys.contains(p));
        if let Some(stray) = stray {
            return Err(ConstraintError::complex_arrangement(format!(
                "nucleotide #{} of {} pairs with #{} of {} outside the branch closed by {x} and {y}",
                view.scene().display_index(key),
                key.molecule_name,
                view.scene().display_index(&stray),
                stray.molecule_name
            )));
        }
    }
    Ok(keys)
}
