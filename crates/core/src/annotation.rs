//! Label geometry carried along with moved nucleotides.
//!
//! Label offsets are relative to their nucleotide, so translation needs no
//! work here. Rotations and reflections are applied to offsets captured when
//! a drag starts, which keeps repeated updates free of accumulated error.

use crate::geometry::reflect_across_line;
use crate::structure_graph::{LabelLine, NucleotideKey, Scene};
use crate::vector2d::Vector2D;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
struct LabelOffsets {
    content: Option<Vector2D>,
    line: Option<LabelLine>,
}

/// Label offsets of a set of nucleotides at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnotationSnapshot {
    labels: BTreeMap<NucleotideKey, LabelOffsets>,
}

impl AnnotationSnapshot {
    /// Capture the labels of `keys`. Nucleotides without labels are skipped.
    pub fn capture<'k>(scene: &Scene, keys: impl IntoIterator<Item = &'k NucleotideKey>) -> Self {
        let labels = keys
            .into_iter()
            .filter_map(|key| {
                let n = scene.get_nucleotide(key)?;
                if n.label_content_position.is_none() && n.label_line.is_none() {
                    return None;
                }
                Some((
                    key.clone(),
                    LabelOffsets {
                        content: n.label_content_position,
                        line: n.label_line.clone(),
                    },
                ))
            })
            .collect();
        Self { labels }
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Set `key`'s label to its captured offsets rotated by `angle`.
    /// Returns whether anything changed.
    pub fn rotate(&self, scene: &mut Scene, key: &NucleotideKey, angle: f64) -> bool {
        self.apply(scene, key, |offset| offset.rotate(angle))
    }

    /// Set `key`'s label to its captured offsets mirrored across `direction`.
    pub fn reflect(&self, scene: &mut Scene, key: &NucleotideKey, direction: Vector2D) -> bool {
        self.apply(scene, key, |offset| {
            reflect_across_line(offset, Vector2D::ZERO, direction)
        })
    }

    fn apply(
        &self,
        scene: &mut Scene,
        key: &NucleotideKey,
        transform: impl Fn(Vector2D) -> Vector2D,
    ) -> bool {
        let (Some(captured), Some(nucleotide)) =
            (self.labels.get(key), scene.get_nucleotide_mut(key))
        else {
            return false;
        };
        nucleotide.label_content_position = captured.content.map(&transform);
        nucleotide.label_line = captured.line.as_ref().map(|line| LabelLine {
            points: line.points.iter().map(|&p| transform(p)).collect(),
        });
        true
    }
}
