use serde::{Deserialize, Serialize};

/// Flags recognized when a constraint is constructed.
///
/// Omitted fields take their default when deserialized.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ConstraintOptions {
    /// Carry the loop of a hairpin along with the pair or helix that closes it (default: true)
    pub affect_hairpin_nucleotides: bool,
    /// Stop single strands where the frozen status of the residues changes (default: false)
    pub truncate_rna_single_strand_flag: bool,
    /// Hide mismatch pairs from every traversal (default: false)
    pub treat_noncanonical_base_pairs_as_unpaired: bool,
}

impl Default for ConstraintOptions {
    fn default() -> Self {
        Self {
            affect_hairpin_nucleotides: true,
            truncate_rna_single_strand_flag: false,
            treat_noncanonical_base_pairs_as_unpaired: false,
        }
    }
}
