//! Interaction constraints: one per topology kind.
//!
//! A constraint is built from a clicked key by graph traversal, then drives
//! drags and discrete edits over the member set it derived. Constraints hold
//! keys only and receive the scene on every call.

mod bulk;
mod cycle;
mod helix;
mod single_base_pair;
mod single_nucleotide;
mod single_strand;
mod stacked_helix;
mod subdomain;

pub use bulk::BulkConstraint;
pub use cycle::CycleConstraint;
pub use helix::HelixConstraint;
pub use single_base_pair::SingleBasePairConstraint;
pub use single_nucleotide::SingleNucleotideConstraint;
pub use single_strand::{Orientation, SingleStrandConstraint, StrandStrategy};
pub use stacked_helix::StackedHelixConstraint;
pub use subdomain::SubdomainConstraint;

use crate::drag::LinearDrag;
use crate::error::ConstraintError;
use crate::options::ConstraintOptions;
use crate::rerender_batch::RerenderBatch;
use crate::structure_graph::{
    BasePairKey, BasePairType, Color, Font, FrozenSet, NucleotideIndex, NucleotideKey, Scene,
};
use crate::topology::{find_helix, TopologyView};
use crate::vector2d::Vector2D;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    SingleNucleotide,
    SingleBasePair,
    RnaSingleStrand,
    RnaHelix,
    RnaStackedHelix,
    RnaSubDomain,
    RnaCycle,
    RnaMolecule,
    RnaComplex,
    EntireScene,
    SingleColor,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConstraintKind::SingleNucleotide => "single nucleotide",
            ConstraintKind::SingleBasePair => "single base pair",
            ConstraintKind::RnaSingleStrand => "RNA single strand",
            ConstraintKind::RnaHelix => "RNA helix",
            ConstraintKind::RnaStackedHelix => "RNA stacked helix",
            ConstraintKind::RnaSubDomain => "RNA subdomain",
            ConstraintKind::RnaCycle => "RNA cycle",
            ConstraintKind::RnaMolecule => "RNA molecule",
            ConstraintKind::RnaComplex => "RNA complex",
            ConstraintKind::EntireScene => "entire scene",
            ConstraintKind::SingleColor => "single color",
        };
        f.write_str(name)
    }
}

/// What the user clicked and which topology it should be read as.
///
/// `partner` selects one pair of a nucleotide with several simultaneous base pairs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintRequest {
    SingleNucleotide {
        key: NucleotideKey,
    },
    SingleBasePair {
        key: NucleotideKey,
        #[serde(default)]
        partner: Option<NucleotideKey>,
    },
    RnaSingleStrand {
        key: NucleotideKey,
    },
    RnaHelix {
        key: NucleotideKey,
        #[serde(default)]
        partner: Option<NucleotideKey>,
    },
    RnaStackedHelix {
        key: NucleotideKey,
        #[serde(default)]
        partner: Option<NucleotideKey>,
    },
    RnaSubDomain {
        key: NucleotideKey,
        #[serde(default)]
        partner: Option<NucleotideKey>,
    },
    RnaCycle {
        key: NucleotideKey,
    },
    RnaMolecule {
        key: NucleotideKey,
    },
    RnaComplex {
        key: NucleotideKey,
    },
    EntireScene {
        key: NucleotideKey,
    },
    SingleColor {
        key: NucleotideKey,
    },
}

impl ConstraintRequest {
    pub fn kind(&self) -> ConstraintKind {
        match self {
            Self::SingleNucleotide { .. } => ConstraintKind::SingleNucleotide,
            Self::SingleBasePair { .. } => ConstraintKind::SingleBasePair,
            Self::RnaSingleStrand { .. } => ConstraintKind::RnaSingleStrand,
            Self::RnaHelix { .. } => ConstraintKind::RnaHelix,
            Self::RnaStackedHelix { .. } => ConstraintKind::RnaStackedHelix,
            Self::RnaSubDomain { .. } => ConstraintKind::RnaSubDomain,
            Self::RnaCycle { .. } => ConstraintKind::RnaCycle,
            Self::RnaMolecule { .. } => ConstraintKind::RnaMolecule,
            Self::RnaComplex { .. } => ConstraintKind::RnaComplex,
            Self::EntireScene { .. } => ConstraintKind::EntireScene,
            Self::SingleColor { .. } => ConstraintKind::SingleColor,
        }
    }

    /// The clicked nucleotide.
    pub fn key(&self) -> &NucleotideKey {
        match self {
            Self::SingleNucleotide { key }
            | Self::SingleBasePair { key, .. }
            | Self::RnaSingleStrand { key }
            | Self::RnaHelix { key, .. }
            | Self::RnaStackedHelix { key, .. }
            | Self::RnaSubDomain { key, .. }
            | Self::RnaCycle { key }
            | Self::RnaMolecule { key }
            | Self::RnaComplex { key }
            | Self::EntireScene { key }
            | Self::SingleColor { key } => key,
        }
    }
}

/// The drag contract shared by every constraint.
pub trait InteractionConstraint {
    fn kind(&self) -> ConstraintKind;

    /// Every key the constraint derived, frozen ones included. Sorted, except
    /// for cycles, which keep traversal order.
    fn member_keys(&self) -> &[NucleotideKey];

    /// Snapshot the member positions and report the drag anchor.
    fn initiate_drag(&mut self, scene: &Scene) -> Vector2D;

    /// Move the members for a pointer displaced by `total_drag` since
    /// [`initiate_drag`](Self::initiate_drag).
    fn continue_drag(
        &mut self,
        scene: &mut Scene,
        total_drag: Vector2D,
        reposition_annotations: bool,
    ) -> RerenderBatch;

    fn broadcast_color(&self, scene: &mut Scene, color: Color) -> RerenderBatch {
        let mut batch = RerenderBatch::new();
        for key in self.member_keys() {
            if let Some(n) = scene.get_nucleotide_mut(key) {
                n.color = Some(color);
                batch.add_nucleotide(scene, key);
            }
        }
        batch
    }

    fn broadcast_font(&self, scene: &mut Scene, font: &Font) -> RerenderBatch {
        let mut batch = RerenderBatch::new();
        for key in self.member_keys() {
            if let Some(n) = scene.get_nucleotide_mut(key) {
                n.font = Some(font.clone());
                batch.add_nucleotide(scene, key);
            }
        }
        batch
    }
}

// ── Shared building blocks ──────────────────────────────────────────

/// Linear drag over the movable members, anchored at the grabbed nucleotide.
#[derive(Debug, Clone)]
pub(crate) struct LinearInteraction {
    grabbed: NucleotideKey,
    movable: Vec<NucleotideKey>,
    drag: Option<LinearDrag>,
}

impl LinearInteraction {
    pub(crate) fn new(grabbed: NucleotideKey, members: &[NucleotideKey], frozen: &FrozenSet) -> Self {
        Self {
            grabbed,
            movable: members
                .iter()
                .filter(|k| !frozen.contains(k))
                .cloned()
                .collect(),
            drag: None,
        }
    }

    pub(crate) fn initiate(&mut self, scene: &Scene) -> Vector2D {
        let anchor = scene.position(&self.grabbed).unwrap_or(Vector2D::ZERO);
        self.drag = Some(LinearDrag::new(scene, anchor, &self.movable));
        anchor
    }

    pub(crate) fn update(&mut self, scene: &mut Scene, total_drag: Vector2D) -> RerenderBatch {
        if self.drag.is_none() {
            self.initiate(scene);
        }
        let mut batch = RerenderBatch::new();
        if let Some(drag) = &self.drag {
            drag.update(scene, drag.anchor() + total_drag, &mut batch);
        }
        batch
    }
}

/// Sorted, deduplicated keys.
pub(crate) fn sorted_keys(mut keys: Vec<NucleotideKey>) -> Vec<NucleotideKey> {
    keys.sort();
    keys.dedup();
    keys
}

pub(crate) fn require_present(scene: &Scene, key: &NucleotideKey) -> Result<(), ConstraintError> {
    if scene.contains(key) {
        Ok(())
    } else {
        Err(ConstraintError::not_found(key))
    }
}

/// Fails when no member may move.
pub(crate) fn require_movable(
    scene: &Scene,
    members: &[NucleotideKey],
    frozen: &FrozenSet,
    kind: ConstraintKind,
) -> Result<(), ConstraintError> {
    if members.iter().any(|k| !frozen.contains(k)) {
        return Ok(());
    }
    let described = members
        .first()
        .map(|k| format!("#{} of {}", scene.display_index(k), k.molecule_name))
        .unwrap_or_default();
    Err(ConstraintError::frozen(format!(
        "every nucleotide of the {kind} starting at {described} is frozen"
    )))
}

/// The innermost pair of the helix through an intra-molecule pair, when every
/// residue it encloses is unpaired.
pub(crate) fn closes_hairpin(
    view: &TopologyView<'_>,
    key0: &NucleotideKey,
    key1: &NucleotideKey,
) -> Option<(NucleotideIndex, NucleotideIndex)> {
    if !key0.same_molecule(key1) {
        return None;
    }
    let (a, b) = find_helix(view, key0, key1).inner_pair();
    let (lo, hi) = (a.min(b), a.max(b));
    ((lo + 1)..hi)
        .all(|i| {
            let k = key0.with_index(i);
            view.contains(&k) && !view.is_paired(&k)
        })
        .then_some((lo, hi))
}

/// Retype existing pairs. Pairs absent from the scene are skipped.
pub(crate) fn retype_base_pairs(
    scene: &mut Scene,
    pairs: &[BasePairKey],
    base_pair_type: BasePairType,
) -> RerenderBatch {
    let mut batch = RerenderBatch::new();
    for pair in pairs {
        let Some(complex) = scene.complex_mut(pair.complex_index) else {
            continue;
        };
        let changed = complex.set_base_pair_type(
            &pair.first.0,
            pair.first.1,
            &pair.second.0,
            pair.second.1,
            Some(base_pair_type),
        );
        if changed {
            let (k0, k1) = pair.keys();
            batch.add_base_pair(pair.clone());
            batch.nucleotides.insert(k0);
            batch.nucleotides.insert(k1);
        }
    }
    batch
}

// ── Handle ──────────────────────────────────────────────────────────

/// A ready constraint of any kind.
#[derive(Debug, Clone)]
pub enum ConstraintHandle {
    SingleNucleotide(SingleNucleotideConstraint),
    SingleBasePair(SingleBasePairConstraint),
    RnaSingleStrand(SingleStrandConstraint),
    RnaHelix(HelixConstraint),
    RnaStackedHelix(StackedHelixConstraint),
    RnaSubDomain(SubdomainConstraint),
    RnaCycle(CycleConstraint),
    /// Molecule, complex, scene and color selections.
    Bulk(BulkConstraint),
}

impl ConstraintHandle {
    /// Resolve the member set for `request`. Traversal errors abort construction.
    #[instrument(skip_all, fields(kind = %request.kind(), key = %request.key()))]
    pub fn new(
        scene: &Scene,
        frozen: &FrozenSet,
        options: &ConstraintOptions,
        request: &ConstraintRequest,
    ) -> Result<Self, ConstraintError> {
        let handle = match request {
            ConstraintRequest::SingleNucleotide { key } => {
                Self::SingleNucleotide(SingleNucleotideConstraint::new(scene, frozen, options, key)?)
            }
            ConstraintRequest::SingleBasePair { key, partner } => Self::SingleBasePair(
                SingleBasePairConstraint::new(scene, frozen, options, key, partner.as_ref())?,
            ),
            ConstraintRequest::RnaSingleStrand { key } => {
                Self::RnaSingleStrand(SingleStrandConstraint::new(scene, frozen, options, key)?)
            }
            ConstraintRequest::RnaHelix { key, partner } => Self::RnaHelix(HelixConstraint::new(
                scene,
                frozen,
                options,
                key,
                partner.as_ref(),
            )?),
            ConstraintRequest::RnaStackedHelix { key, partner } => Self::RnaStackedHelix(
                StackedHelixConstraint::new(scene, frozen, options, key, partner.as_ref())?,
            ),
            ConstraintRequest::RnaSubDomain { key, partner } => Self::RnaSubDomain(
                SubdomainConstraint::new(scene, frozen, options, key, partner.as_ref())?,
            ),
            ConstraintRequest::RnaCycle { key } => {
                Self::RnaCycle(CycleConstraint::new(scene, frozen, options, key)?)
            }
            ConstraintRequest::RnaMolecule { key }
            | ConstraintRequest::RnaComplex { key }
            | ConstraintRequest::EntireScene { key }
            | ConstraintRequest::SingleColor { key } => Self::Bulk(BulkConstraint::new(
                scene,
                frozen,
                options,
                request.kind(),
                key,
            )?),
        };
        debug!(members = handle.member_keys().len(), "constraint ready");
        Ok(handle)
    }

    fn as_dyn(&self) -> &dyn InteractionConstraint {
        match self {
            Self::SingleNucleotide(c) => c,
            Self::SingleBasePair(c) => c,
            Self::RnaSingleStrand(c) => c,
            Self::RnaHelix(c) => c,
            Self::RnaStackedHelix(c) => c,
            Self::RnaSubDomain(c) => c,
            Self::RnaCycle(c) => c,
            Self::Bulk(c) => c,
        }
    }

    fn as_dyn_mut(&mut self) -> &mut dyn InteractionConstraint {
        match self {
            Self::SingleNucleotide(c) => c,
            Self::SingleBasePair(c) => c,
            Self::RnaSingleStrand(c) => c,
            Self::RnaHelix(c) => c,
            Self::RnaStackedHelix(c) => c,
            Self::RnaSubDomain(c) => c,
            Self::RnaCycle(c) => c,
            Self::Bulk(c) => c,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        self.as_dyn().kind()
    }

    pub fn member_keys(&self) -> &[NucleotideKey] {
        self.as_dyn().member_keys()
    }

    pub fn initiate_drag(&mut self, scene: &Scene) -> Vector2D {
        self.as_dyn_mut().initiate_drag(scene)
    }

    pub fn continue_drag(
        &mut self,
        scene: &mut Scene,
        total_drag: Vector2D,
        reposition_annotations: bool,
    ) -> RerenderBatch {
        self.as_dyn_mut()
            .continue_drag(scene, total_drag, reposition_annotations)
    }

    pub fn broadcast_color(&self, scene: &mut Scene, color: Color) -> RerenderBatch {
        self.as_dyn().broadcast_color(scene, color)
    }

    pub fn broadcast_font(&self, scene: &mut Scene, font: &Font) -> RerenderBatch {
        self.as_dyn().broadcast_font(scene, font)
    }

    fn unsupported(&self, operation: &'static str) -> ConstraintError {
        ConstraintError::UnsupportedOperation {
            operation,
            kind: self.kind(),
        }
    }

    #[instrument(skip_all, fields(kind = %self.kind(), radius = radius))]
    pub fn set_radius(
        &mut self,
        scene: &mut Scene,
        radius: f64,
    ) -> Result<RerenderBatch, ConstraintError> {
        match self {
            Self::RnaCycle(c) => c.set_radius(scene, radius),
            _ => Err(self.unsupported("set_radius")),
        }
    }

    #[instrument(skip_all, fields(kind = %self.kind()))]
    pub fn normalize(&mut self, scene: &mut Scene) -> Result<RerenderBatch, ConstraintError> {
        match self {
            Self::RnaCycle(c) => c.normalize(scene),
            _ => Err(self.unsupported("normalize")),
        }
    }

    #[instrument(skip_all, fields(kind = %self.kind(), orientation = ?orientation))]
    pub fn set_orientation(
        &mut self,
        scene: &mut Scene,
        orientation: Orientation,
        displacement_along_normal: f64,
    ) -> Result<RerenderBatch, ConstraintError> {
        match self {
            Self::RnaSingleStrand(c) => {
                c.set_orientation(scene, orientation, displacement_along_normal)
            }
            _ => Err(self.unsupported("set_orientation")),
        }
    }

    #[instrument(skip_all, fields(kind = %self.kind()))]
    pub fn flip(&mut self, scene: &mut Scene) -> Result<RerenderBatch, ConstraintError> {
        match self {
            Self::RnaSingleStrand(c) => c.flip(scene),
            Self::RnaCycle(c) => c.flip(scene),
            _ => Err(self.unsupported("flip")),
        }
    }

    /// Retype the pairs this constraint formats: the clicked pair, the helix
    /// pairs, or the free-standing helices of a complex or scene.
    #[instrument(skip_all, fields(kind = %self.kind(), base_pair_type = ?base_pair_type))]
    pub fn set_base_pair_type(
        &self,
        scene: &mut Scene,
        base_pair_type: BasePairType,
    ) -> Result<RerenderBatch, ConstraintError> {
        match self {
            Self::SingleBasePair(c) => Ok(c.set_base_pair_type(scene, base_pair_type)),
            Self::RnaHelix(c) => Ok(c.set_base_pair_type(scene, base_pair_type)),
            Self::RnaStackedHelix(c) => Ok(c.set_base_pair_type(scene, base_pair_type)),
            Self::Bulk(c) if c.helices().is_some() => {
                Ok(c.set_base_pair_type_for_helices(scene, base_pair_type))
            }
            _ => Err(self.unsupported("set_base_pair_type")),
        }
    }
}
