use crate::vector2d::Vector2D;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub type ComplexIndex = u32;
pub type NucleotideIndex = i64;

/// Identifies one residue anywhere in a [`Scene`].
///
/// The derived ordering (complex, then molecule name, then index) is the
/// lexicographic order used to pick canonical anchors.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NucleotideKey {
    pub complex_index: ComplexIndex,
    pub molecule_name: String,
    pub nucleotide_index: NucleotideIndex,
}

impl NucleotideKey {
    pub fn new(
        complex_index: ComplexIndex,
        molecule_name: impl Into<String>,
        nucleotide_index: NucleotideIndex,
    ) -> Self {
        Self {
            complex_index,
            molecule_name: molecule_name.into(),
            nucleotide_index,
        }
    }

    /// The key of a residue in the same molecule.
    pub fn with_index(&self, nucleotide_index: NucleotideIndex) -> Self {
        Self {
            complex_index: self.complex_index,
            molecule_name: self.molecule_name.clone(),
            nucleotide_index,
        }
    }

    /// The key of a residue in the same complex.
    pub fn sibling(&self, molecule_name: &str, nucleotide_index: NucleotideIndex) -> Self {
        Self {
            complex_index: self.complex_index,
            molecule_name: molecule_name.to_string(),
            nucleotide_index,
        }
    }

    /// The key `step` residues along the backbone, or `None` past the index range.
    pub fn offset(&self, step: NucleotideIndex) -> Option<Self> {
        self.nucleotide_index
            .checked_add(step)
            .map(|i| self.with_index(i))
    }

    pub fn same_molecule(&self, other: &NucleotideKey) -> bool {
        self.complex_index == other.complex_index && self.molecule_name == other.molecule_name
    }
}

impl fmt::Display for NucleotideKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.complex_index, self.molecule_name, self.nucleotide_index
        )
    }
}

/// An unordered base pair, stored with the smaller key first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BasePairKey {
    pub complex_index: ComplexIndex,
    pub first: (String, NucleotideIndex),
    pub second: (String, NucleotideIndex),
}

impl BasePairKey {
    pub fn new(key0: &NucleotideKey, molecule_name: &str, nucleotide_index: NucleotideIndex) -> Self {
        let a = (key0.molecule_name.clone(), key0.nucleotide_index);
        let b = (molecule_name.to_string(), nucleotide_index);
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            complex_index: key0.complex_index,
            first,
            second,
        }
    }

    pub fn keys(&self) -> (NucleotideKey, NucleotideKey) {
        (
            NucleotideKey::new(self.complex_index, self.first.0.clone(), self.first.1),
            NucleotideKey::new(self.complex_index, self.second.0.clone(), self.second.1),
        )
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BasePairType {
    Canonical,
    Wobble,
    Mismatch,
}

impl BasePairType {
    /// Watson-Crick pairs are canonical, G·U is a wobble, everything else a mismatch.
    /// `T` is read as `U`; symbols are case-insensitive.
    pub fn classify(symbol0: char, symbol1: char) -> BasePairType {
        let norm = |c: char| match c.to_ascii_uppercase() {
            'T' => 'U',
            other => other,
        };
        match (norm(symbol0), norm(symbol1)) {
            ('A', 'U') | ('U', 'A') | ('G', 'C') | ('C', 'G') => BasePairType::Canonical,
            ('G', 'U') | ('U', 'G') => BasePairType::Wobble,
            _ => BasePairType::Mismatch,
        }
    }
}

/// One entry of a complex's base-pair table: the partner of the residue it is filed under.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MappedBasePair {
    pub molecule_name: String,
    pub nucleotide_index: NucleotideIndex,
    pub base_pair_type: Option<BasePairType>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self { red, green, blue }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub weight: String,
    pub style: String,
}

/// Polyline from a nucleotide to its label. Points are offsets from the nucleotide.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct LabelLine {
    pub points: Vec<Vector2D>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Nucleotide {
    pub symbol: char,
    pub position: Vector2D,
    /// Offset of the label text from `position`.
    #[serde(default)]
    pub label_content_position: Option<Vector2D>,
    #[serde(default)]
    pub label_line: Option<LabelLine>,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub font: Option<Font>,
}

impl Nucleotide {
    pub fn new(symbol: char, position: Vector2D) -> Self {
        Self {
            symbol,
            position,
            label_content_position: None,
            label_line: None,
            color: None,
            font: None,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Molecule {
    pub name: String,
    /// Added to internal indices to obtain the numbering shown to users.
    pub first_nucleotide_index: NucleotideIndex,
    pub nucleotides: BTreeMap<NucleotideIndex, Nucleotide>,
}

impl Molecule {
    pub fn new(name: impl Into<String>, first_nucleotide_index: NucleotideIndex) -> Self {
        Self {
            name: name.into(),
            first_nucleotide_index,
            nucleotides: BTreeMap::new(),
        }
    }

    pub fn display_index(&self, nucleotide_index: NucleotideIndex) -> NucleotideIndex {
        nucleotide_index.saturating_add(self.first_nucleotide_index)
    }

    pub fn contains(&self, nucleotide_index: NucleotideIndex) -> bool {
        self.nucleotides.contains_key(&nucleotide_index)
    }

    pub fn first_index(&self) -> Option<NucleotideIndex> {
        self.nucleotides.keys().next().copied()
    }

    pub fn last_index(&self) -> Option<NucleotideIndex> {
        self.nucleotides.keys().next_back().copied()
    }
}

pub type BasePairTable = BTreeMap<String, BTreeMap<NucleotideIndex, Vec<MappedBasePair>>>;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Complex {
    pub name: String,
    pub molecules: BTreeMap<String, Molecule>,
    #[serde(default)]
    pub base_pairs: BasePairTable,
}

impl Complex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn molecule(&self, name: &str) -> Option<&Molecule> {
        self.molecules.get(name)
    }

    pub fn insert_molecule(&mut self, molecule: Molecule) {
        self.molecules.insert(molecule.name.clone(), molecule);
    }

    /// Base pairs filed under `(molecule_name, nucleotide_index)`. Unpaired residues give `None`.
    pub fn base_pairs_for(
        &self,
        molecule_name: &str,
        nucleotide_index: NucleotideIndex,
    ) -> Option<&[MappedBasePair]> {
        self.base_pairs
            .get(molecule_name)
            .and_then(|per_molecule| per_molecule.get(&nucleotide_index))
            .map(Vec::as_slice)
            .filter(|pairs| !pairs.is_empty())
    }

    /// Record a base pair in both directions. A duplicate entry is replaced.
    pub fn add_base_pair(
        &mut self,
        molecule0: &str,
        index0: NucleotideIndex,
        molecule1: &str,
        index1: NucleotideIndex,
        base_pair_type: Option<BasePairType>,
    ) {
        self.insert_directed(molecule0, index0, molecule1, index1, base_pair_type);
        self.insert_directed(molecule1, index1, molecule0, index0, base_pair_type);
    }

    fn insert_directed(
        &mut self,
        molecule0: &str,
        index0: NucleotideIndex,
        molecule1: &str,
        index1: NucleotideIndex,
        base_pair_type: Option<BasePairType>,
    ) {
        let entries = self
            .base_pairs
            .entry(molecule0.to_string())
            .or_default()
            .entry(index0)
            .or_default();
        entries.retain(|p| !(p.molecule_name == molecule1 && p.nucleotide_index == index1));
        entries.push(MappedBasePair {
            molecule_name: molecule1.to_string(),
            nucleotide_index: index1,
            base_pair_type,
        });
    }

    /// Remove a base pair in both directions. Returns whether it existed.
    pub fn remove_base_pair(
        &mut self,
        molecule0: &str,
        index0: NucleotideIndex,
        molecule1: &str,
        index1: NucleotideIndex,
    ) -> bool {
        let a = self.remove_directed(molecule0, index0, molecule1, index1);
        let b = self.remove_directed(molecule1, index1, molecule0, index0);
        a || b
    }

    fn remove_directed(
        &mut self,
        molecule0: &str,
        index0: NucleotideIndex,
        molecule1: &str,
        index1: NucleotideIndex,
    ) -> bool {
        let Some(per_molecule) = self.base_pairs.get_mut(molecule0) else {
            return false;
        };
        let Some(entries) = per_molecule.get_mut(&index0) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|p| !(p.molecule_name == molecule1 && p.nucleotide_index == index1));
        let removed = entries.len() != before;
        if entries.is_empty() {
            per_molecule.remove(&index0);
        }
        removed
    }

    /// Change the stored type of an existing pair in both directions.
    /// Returns `false` when the pair does not exist.
    pub fn set_base_pair_type(
        &mut self,
        molecule0: &str,
        index0: NucleotideIndex,
        molecule1: &str,
        index1: NucleotideIndex,
        base_pair_type: Option<BasePairType>,
    ) -> bool {
        let mut found = false;
        for (m0, i0, m1, i1) in [
            (molecule0, index0, molecule1, index1),
            (molecule1, index1, molecule0, index0),
        ] {
            if let Some(entries) = self
                .base_pairs
                .get_mut(m0)
                .and_then(|per_molecule| per_molecule.get_mut(&i0))
            {
                for entry in entries
                    .iter_mut()
                    .filter(|p| p.molecule_name == m1 && p.nucleotide_index == i1)
                {
                    entry.base_pair_type = base_pair_type;
                    found = true;
                }
            }
        }
        found
    }

    /// Classify every untyped pair from the residue symbols.
    pub fn classify_base_pairs(&mut self) {
        let mut updates = Vec::new();
        for (molecule_name, per_molecule) in &self.base_pairs {
            for (&index, entries) in per_molecule {
                for (slot, entry) in entries.iter().enumerate() {
                    if entry.base_pair_type.is_some() {
                        continue;
                    }
                    let s0 = self.symbol(molecule_name, index);
                    let s1 = self.symbol(&entry.molecule_name, entry.nucleotide_index);
                    if let (Some(s0), Some(s1)) = (s0, s1) {
                        updates.push((
                            molecule_name.clone(),
                            index,
                            slot,
                            BasePairType::classify(s0, s1),
                        ));
                    }
                }
            }
        }
        for (molecule_name, index, slot, t) in updates {
            if let Some(entry) = self
                .base_pairs
                .get_mut(&molecule_name)
                .and_then(|m| m.get_mut(&index))
                .and_then(|entries| entries.get_mut(slot))
            {
                entry.base_pair_type = Some(t);
            }
        }
    }

    fn symbol(&self, molecule_name: &str, index: NucleotideIndex) -> Option<char> {
        self.molecules
            .get(molecule_name)
            .and_then(|m| m.nucleotides.get(&index))
            .map(|n| n.symbol)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Scene {
    pub complexes: BTreeMap<ComplexIndex, Complex>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn complex(&self, complex_index: ComplexIndex) -> Option<&Complex> {
        self.complexes.get(&complex_index)
    }

    pub fn complex_mut(&mut self, complex_index: ComplexIndex) -> Option<&mut Complex> {
        self.complexes.get_mut(&complex_index)
    }

    pub fn molecule(&self, complex_index: ComplexIndex, molecule_name: &str) -> Option<&Molecule> {
        self.complex(complex_index)
            .and_then(|c| c.molecules.get(molecule_name))
    }

    pub fn get_nucleotide(&self, key: &NucleotideKey) -> Option<&Nucleotide> {
        self.molecule(key.complex_index, &key.molecule_name)
            .and_then(|m| m.nucleotides.get(&key.nucleotide_index))
    }

    pub fn get_nucleotide_mut(&mut self, key: &NucleotideKey) -> Option<&mut Nucleotide> {
        self.complexes
            .get_mut(&key.complex_index)
            .and_then(|c| c.molecules.get_mut(&key.molecule_name))
            .and_then(|m| m.nucleotides.get_mut(&key.nucleotide_index))
    }

    pub fn contains(&self, key: &NucleotideKey) -> bool {
        self.get_nucleotide(key).is_some()
    }

    pub fn position(&self, key: &NucleotideKey) -> Option<Vector2D> {
        self.get_nucleotide(key).map(|n| n.position)
    }

    /// Returns whether the nucleotide exists.
    pub fn set_position(&mut self, key: &NucleotideKey, position: Vector2D) -> bool {
        match self.get_nucleotide_mut(key) {
            Some(n) => {
                n.position = position;
                true
            }
            None => false,
        }
    }

    /// Unfiltered base pairs of a residue; `None` when unpaired or absent.
    pub fn get_base_pairs_for(&self, key: &NucleotideKey) -> Option<&[MappedBasePair]> {
        self.complex(key.complex_index)
            .and_then(|c| c.base_pairs_for(&key.molecule_name, key.nucleotide_index))
    }

    /// Index shown to users for `key`.
    pub fn display_index(&self, key: &NucleotideKey) -> NucleotideIndex {
        self.molecule(key.complex_index, &key.molecule_name)
            .map(|m| m.display_index(key.nucleotide_index))
            .unwrap_or(key.nucleotide_index)
    }

    /// Every nucleotide key, in key order.
    pub fn keys(&self) -> impl Iterator<Item = NucleotideKey> + '_ {
        self.complexes.iter().flat_map(|(&ci, complex)| {
            complex.molecules.values().flat_map(move |molecule| {
                molecule
                    .nucleotides
                    .keys()
                    .map(move |&ni| NucleotideKey::new(ci, molecule.name.clone(), ni))
            })
        })
    }
}

/// Residues whose positions this engine must not change.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct FrozenSet(BTreeSet<NucleotideKey>);

impl FrozenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: NucleotideKey) -> bool {
        self.0.insert(key)
    }

    pub fn contains(&self, key: &NucleotideKey) -> bool {
        self.0.contains(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &NucleotideKey> {
        self.0.iter()
    }
}

impl FromIterator<NucleotideKey> for FrozenSet {
    fn from_iter<I: IntoIterator<Item = NucleotideKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_residue_complex() -> Complex {
        let mut molecule = Molecule::new("rna", 1);
        molecule
            .nucleotides
            .insert(0, Nucleotide::new('G', Vector2D::new(0.0, 0.0)));
        molecule
            .nucleotides
            .insert(1, Nucleotide::new('U', Vector2D::new(1.0, 0.0)));
        let mut complex = Complex::new("c");
        complex.insert_molecule(molecule);
        complex
    }

    #[test]
    fn test_add_base_pair_is_bidirectional() {
        let mut complex = two_residue_complex();
        complex.add_base_pair("rna", 0, "rna", 1, None);
        assert_eq!(complex.base_pairs_for("rna", 0).unwrap()[0].nucleotide_index, 1);
        assert_eq!(complex.base_pairs_for("rna", 1).unwrap()[0].nucleotide_index, 0);

        // Re-adding replaces instead of duplicating.
        complex.add_base_pair("rna", 1, "rna", 0, Some(BasePairType::Wobble));
        assert_eq!(complex.base_pairs_for("rna", 0).unwrap().len(), 1);
        assert_eq!(
            complex.base_pairs_for("rna", 0).unwrap()[0].base_pair_type,
            Some(BasePairType::Wobble)
        );
    }

    #[test]
    fn test_remove_base_pair() {
        let mut complex = two_residue_complex();
        complex.add_base_pair("rna", 0, "rna", 1, None);
        assert!(complex.remove_base_pair("rna", 1, "rna", 0));
        assert!(complex.base_pairs_for("rna", 0).is_none());
        assert!(complex.base_pairs_for("rna", 1).is_none());
        assert!(!complex.remove_base_pair("rna", 1, "rna", 0));
    }

    #[test]
    fn test_classify() {
        assert_eq!(BasePairType::classify('g', 'c'), BasePairType::Canonical);
        assert_eq!(BasePairType::classify('A', 'T'), BasePairType::Canonical);
        assert_eq!(BasePairType::classify('U', 'G'), BasePairType::Wobble);
        assert_eq!(BasePairType::classify('A', 'A'), BasePairType::Mismatch);

        let mut complex = two_residue_complex();
        complex.add_base_pair("rna", 0, "rna", 1, None);
        complex.classify_base_pairs();
        assert_eq!(
            complex.base_pairs_for("rna", 1).unwrap()[0].base_pair_type,
            Some(BasePairType::Wobble)
        );
    }

    #[test]
    fn test_scene_lookup_fails_closed() {
        let mut scene = Scene::new();
        scene.complexes.insert(0, two_residue_complex());
        let key = NucleotideKey::new(0, "rna", 1);
        assert_eq!(scene.position(&key), Some(Vector2D::new(1.0, 0.0)));
        assert_eq!(scene.display_index(&key), 2);
        assert!(scene.get_nucleotide(&key.with_index(7)).is_none());
        assert!(scene.get_nucleotide(&NucleotideKey::new(3, "rna", 0)).is_none());
        assert!(!scene.set_position(&key.with_index(7), Vector2D::ZERO));
        assert_eq!(scene.keys().count(), 2);
    }

    #[test]
    fn test_base_pair_key_is_unordered() {
        let a = NucleotideKey::new(0, "b", 4);
        let b = NucleotideKey::new(0, "a", 9);
        assert_eq!(BasePairKey::new(&a, "a", 9), BasePairKey::new(&b, "b", 4));
    }
}
