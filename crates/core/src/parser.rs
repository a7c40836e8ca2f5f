use crate::structure_graph::{Complex, Molecule, NucleotideIndex, Nucleotide};
use crate::vector2d::Vector2D;
use std::f64::consts::PI;
use thiserror::Error;

const OPENERS: [char; 4] = ['(', '[', '{', '<'];
const CLOSERS: [char; 4] = [')', ']', '}', '>'];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("unmatched '{character}' at position {position}")]
    UnmatchedClose { character: char, position: usize },
    #[error("unmatched '{character}' at position {position}")]
    UnmatchedOpen { character: char, position: usize },
    #[error("bad dot-parens character '{character}' at position {position}")]
    BadCharacter { character: char, position: usize },
    #[error("sequence has {found} residues but structure has {expected}")]
    SequenceLength { expected: usize, found: usize },
}

/// Pair table parsed from dot-bracket-plus notation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotBracket {
    /// pairs[i] = Some(j) means residue i pairs with residue j.
    pub pairs: Vec<Option<usize>>,
    /// First residue of every strand. Always starts with 0.
    pub strand_starts: Vec<usize>,
}

impl DotBracket {
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// `(strand, index within strand)` of a residue.
    pub fn locate(&self, residue: usize) -> (usize, usize) {
        let strand = self
            .strand_starts
            .iter()
            .rposition(|&start| start <= residue)
            .unwrap_or(0);
        (strand, residue - self.strand_starts[strand])
    }
}

/// Parse dot-bracket-plus notation.
///
/// `(`, `[`, `{` and `<` open a pair closed by the matching bracket, so
/// pseudoknots can be written with a second bracket type. `.` is an unpaired
/// residue and `+` starts a new strand.
pub fn parse_dot_bracket(input: &str) -> Result<DotBracket, ParseError> {
    let mut pairs: Vec<Option<usize>> = Vec::new();
    let mut strand_starts: Vec<usize> = vec![0];
    let mut stacks: [Vec<(usize, usize)>; 4] = Default::default();

    for (position, ch) in input.chars().enumerate() {
        let residue = pairs.len();
        if let Some(kind) = OPENERS.iter().position(|&c| c == ch) {
            stacks[kind].push((residue, position));
            pairs.push(None);
        } else if let Some(kind) = CLOSERS.iter().position(|&c| c == ch) {
            let (partner, _) = stacks[kind].pop().ok_or(ParseError::UnmatchedClose {
                character: ch,
                position,
            })?;
            pairs.push(Some(partner));
            pairs[partner] = Some(residue);
        } else {
            match ch {
                '.' => pairs.push(None),
                '+' => {
                    if !strand_starts.contains(&residue) {
                        strand_starts.push(residue);
                    }
                }
                _ if ch.is_whitespace() => {}
                _ => {
                    return Err(ParseError::BadCharacter {
                        character: ch,
                        position,
                    })
                }
            }
        }
    }

    for (kind, stack) in stacks.iter().enumerate() {
        if let Some(&(_, position)) = stack.first() {
            return Err(ParseError::UnmatchedOpen {
                character: OPENERS[kind],
                position,
            });
        }
    }

    // A trailing '+' opens no strand.
    let total = pairs.len();
    strand_starts.retain(|&s| s < total || s == 0);

    Ok(DotBracket {
        pairs,
        strand_starts,
    })
}

/// Build a complex from dot-bracket-plus notation.
///
/// Strand `k` becomes molecule `strand{k}` with internal indices starting at 0
/// and display numbering starting at 1. Residues are placed on one circle with
/// unit spacing, in sequence order, so every pair has a distinct chord.
/// Without a sequence every symbol is `N` and pairs stay untyped.
pub fn build_complex(
    name: &str,
    structure: &str,
    sequence: Option<&str>,
) -> Result<Complex, ParseError> {
    let db = parse_dot_bracket(structure)?;
    let n = db.len();

    let symbols: Option<Vec<char>> = sequence.map(|s| {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != '+' && *c != '&')
            .collect()
    });
    if let Some(symbols) = &symbols {
        if symbols.len() != n {
            return Err(ParseError::SequenceLength {
                expected: n,
                found: symbols.len(),
            });
        }
    }

    let mut complex = Complex::new(name);
    for k in 0..db.strand_starts.len() {
        complex.insert_molecule(Molecule::new(strand_name(k), 1));
    }

    let radius = n as f64 / (2.0 * PI);
    for residue in 0..n {
        let (strand, index) = db.locate(residue);
        let angle = PI / 2.0 - 2.0 * PI * residue as f64 / n as f64;
        let position = Vector2D::new(radius * angle.cos(), radius * angle.sin());
        let symbol = symbols.as_ref().map_or('N', |s| s[residue]);
        if let Some(molecule) = complex.molecules.get_mut(&strand_name(strand)) {
            molecule
                .nucleotides
                .insert(index as NucleotideIndex, Nucleotide::new(symbol, position));
        }
    }

    for (residue, partner) in db.pairs.iter().enumerate() {
        let Some(partner) = *partner else { continue };
        if residue > partner {
            continue;
        }
        let (s0, i0) = db.locate(residue);
        let (s1, i1) = db.locate(partner);
        complex.add_base_pair(
            &strand_name(s0),
            i0 as NucleotideIndex,
            &strand_name(s1),
            i1 as NucleotideIndex,
            None,
        );
    }
    if symbols.is_some() {
        complex.classify_base_pairs();
    }

    Ok(complex)
}

impl Complex {
    /// See [`build_complex`].
    pub fn from_dot_bracket(
        name: &str,
        structure: &str,
        sequence: Option<&str>,
    ) -> Result<Complex, ParseError> {
        build_complex(name, structure, sequence)
    }
}

pub fn strand_name(strand: usize) -> String {
    format!("strand{strand}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure_graph::BasePairType;

    #[test]
    fn test_simple_pair() {
        let db = parse_dot_bracket("()").unwrap();
        assert_eq!(db.pairs, vec![Some(1), Some(0)]);
        assert_eq!(db.strand_starts, vec![0]);
    }

    #[test]
    fn test_nested() {
        let db = parse_dot_bracket("(((...)))").unwrap();
        assert_eq!(db.pairs[0], Some(8));
        assert_eq!(db.pairs[2], Some(6));
        assert_eq!(db.pairs[4], None);
    }

    #[test]
    fn test_pseudoknot_brackets() {
        let db = parse_dot_bracket("((..[[..))..]]").unwrap();
        assert_eq!(db.pairs[0], Some(9));
        assert_eq!(db.pairs[4], Some(13));
        assert_eq!(db.pairs[5], Some(12));
    }

    #[test]
    fn test_nick() {
        let db = parse_dot_bracket("(((.+.)))").unwrap();
        assert_eq!(db.strand_starts, vec![0, 4]);
        assert_eq!(db.locate(5), (1, 1));
        assert_eq!(db.locate(3), (0, 3));
    }

    #[test]
    fn test_unmatched_open() {
        assert_eq!(
            parse_dot_bracket("((..)"),
            Err(ParseError::UnmatchedOpen {
                character: '(',
                position: 0
            })
        );
    }

    #[test]
    fn test_unmatched_close() {
        assert!(matches!(
            parse_dot_bracket("())"),
            Err(ParseError::UnmatchedClose { position: 2, .. })
        ));
    }

    #[test]
    fn test_bad_char() {
        assert!(matches!(
            parse_dot_bracket("(x)"),
            Err(ParseError::BadCharacter { character: 'x', .. })
        ));
    }

    #[test]
    fn test_build_complex_with_strands() {
        let complex = build_complex("duplex", "((+))", Some("GC+GU")).unwrap();
        assert_eq!(complex.molecules.len(), 2);
        let pairs = complex.base_pairs_for("strand0", 0).unwrap();
        assert_eq!(pairs[0].molecule_name, "strand1");
        assert_eq!(pairs[0].nucleotide_index, 1);
        assert_eq!(pairs[0].base_pair_type, Some(BasePairType::Wobble));
        assert_eq!(
            complex.base_pairs_for("strand0", 1).unwrap()[0].base_pair_type,
            Some(BasePairType::Canonical)
        );
    }

    #[test]
    fn test_build_complex_sequence_mismatch() {
        assert_eq!(
            build_complex("c", "(.)", Some("GA")).unwrap_err(),
            ParseError::SequenceLength {
                expected: 3,
                found: 2
            }
        );
    }
}
