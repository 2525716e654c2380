//! Symbol sequences over the nucleotide alphabet.

use std::fmt;

use rand::Rng;

use crate::bit_encoding::{decode_base, encode_base, is_nucleotide};
use crate::error::{Error, Result};

/// An immutable, named sequence of two-bit encoded bases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    name:  String,
    codes: Vec<u8>,
}

impl Sequence {
    /// Parse ASCII bases. Anything outside `ACGTU` (either case) is an error.
    pub fn from_ascii(name: &str, ascii: &[u8]) -> Result<Self> {
        if let Some(pos) = ascii.iter().position(|&b| !is_nucleotide(b)) {
            return Err(Error::InvalidSequence(format!(
                "{name}: symbol {:?} at position {pos} is not one of A, C, G, T",
                ascii[pos] as char
            )));
        }
        Ok(Self {
            name:  name.to_owned(),
            codes: ascii.iter().map(|&b| encode_base(b)).collect(),
        })
    }

    /// Uniformly random bases.
    pub fn random<R: Rng>(name: &str, len: usize, rng: &mut R) -> Self {
        Self {
            name:  name.to_owned(),
            codes: (0..len).map(|_| rng.gen_range(0..4u8)).collect(),
        }
    }

    /// Sequence name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of bases
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// `true` for the empty sequence
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Two-bit codes, one per base
    pub fn codes(&self) -> &[u8] {
        &self.codes
    }

    /// Upper case ASCII
    pub fn to_ascii(&self) -> Vec<u8> {
        self.codes.iter().map(|&c| decode_base(c)).collect()
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({} bp)", self.name, self.codes.len())
    }
}
