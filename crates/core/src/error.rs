use crate::constraints::ConstraintKind;
use crate::structure_graph::NucleotideKey;
use serde::Serialize;
use thiserror::Error;

/// Why a constraint could not be built or a discrete edit could not be applied.
///
/// Every failure leaves the scene untouched.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConstraintError {
    #[error("Nucleotide not found: {key}")]
    NucleotideNotFound { key: NucleotideKey },

    #[error("Nucleotide is not base-paired: {message}")]
    NonBasePairedNucleotide { message: String },

    #[error("Nucleotide is base-paired: {message}")]
    BasePairedNucleotide { message: String },

    #[error("Nucleotide has multiple base pairs: {message}")]
    MultipleBasePairsNucleotide { message: String },

    #[error("Complex base-pair arrangement: {message}")]
    ComplexBasePairArrangement { message: String },

    #[error("Not part of a cycle: {message}")]
    NotPartOfCycle { message: String },

    #[error("Frozen nucleotide: {message}")]
    FrozenNucleotide { message: String },

    #[error("Degenerate geometry: {message}")]
    DegenerateGeometry { message: String },

    #[error("Operation '{operation}' is not supported by the {kind} constraint")]
    UnsupportedOperation {
        operation: &'static str,
        kind: ConstraintKind,
    },
}

/// Payload-free discriminant of [`ConstraintError`].
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintErrorKind {
    NucleotideNotFound,
    NonBasePairedNucleotide,
    BasePairedNucleotide,
    MultipleBasePairsNucleotide,
    ComplexBasePairArrangement,
    NotPartOfCycle,
    FrozenNucleotide,
    DegenerateGeometry,
    UnsupportedOperation,
}

impl ConstraintError {
    pub fn kind(&self) -> ConstraintErrorKind {
        match self {
            Self::NucleotideNotFound { .. } => ConstraintErrorKind::NucleotideNotFound,
            Self::NonBasePairedNucleotide { .. } => ConstraintErrorKind::NonBasePairedNucleotide,
            Self::BasePairedNucleotide { .. } => ConstraintErrorKind::BasePairedNucleotide,
            Self::MultipleBasePairsNucleotide { .. } => {
                ConstraintErrorKind::MultipleBasePairsNucleotide
            }
            Self::ComplexBasePairArrangement { .. } => {
                ConstraintErrorKind::ComplexBasePairArrangement
            }
            Self::NotPartOfCycle { .. } => ConstraintErrorKind::NotPartOfCycle,
            Self::FrozenNucleotide { .. } => ConstraintErrorKind::FrozenNucleotide,
            Self::DegenerateGeometry { .. } => ConstraintErrorKind::DegenerateGeometry,
            Self::UnsupportedOperation { .. } => ConstraintErrorKind::UnsupportedOperation,
        }
    }

    pub(crate) fn not_found(key: &NucleotideKey) -> Self {
        Self::NucleotideNotFound { key: key.clone() }
    }

    pub(crate) fn complex_arrangement(message: impl Into<String>) -> Self {
        Self::ComplexBasePairArrangement {
            message: message.into(),
        }
    }

    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateGeometry {
            message: message.into(),
        }
    }

    pub(crate) fn frozen(message: impl Into<String>) -> Self {
        Self::FrozenNucleotide {
            message: message.into(),
        }
    }
}

/// `{ "kind": ..., "message": ... }` form used by the JSON entry points.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorReport {
    pub kind: ConstraintErrorKind,
    pub message: String,
}

impl From<&ConstraintError> for ErrorReport {
    fn from(err: &ConstraintError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}
