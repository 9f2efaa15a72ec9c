//! Version 0 L2 output.

use alloy_primitives::{B256, keccak256};
use thiserror::Error;

/// A version 0 output: the commitment to an L2 block that output roots are computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct OutputV0 {
    /// The state root of the block.
    pub state_root: B256,
    /// The storage root of the `L2ToL1MessagePasser` contract.
    pub message_passer_storage_root: B256,
    /// The block hash.
    pub block_hash: B256,
}

/// Failures decoding an [`OutputV0`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OutputV0Error {
    /// The encoding does not have the expected length.
    #[error("invalid output length: expected {expected}, got {0}", expected = OutputV0::ENCODED_LENGTH)]
    InvalidLength(usize),
    /// The version prefix is not zero.
    #[error("unsupported output version: {0}")]
    UnsupportedVersion(B256),
}

impl OutputV0 {
    /// The version prefix of this output format.
    pub const VERSION: B256 = B256::ZERO;

    /// Length of [`OutputV0::encode`].
    pub const ENCODED_LENGTH: usize = 128;

    /// Creates a new [`OutputV0`].
    pub const fn new(state_root: B256, message_passer_storage_root: B256, block_hash: B256) -> Self {
        Self { state_root, message_passer_storage_root, block_hash }
    }

    /// Encodes as `version ‖ state_root ‖ message_passer_storage_root ‖ block_hash`.
    pub fn encode(&self) -> [u8; Self::ENCODED_LENGTH] {
        let mut out = [0u8; Self::ENCODED_LENGTH];
        out[..32].copy_from_slice(Self::VERSION.as_slice());
        out[32..64].copy_from_slice(self.state_root.as_slice());
        out[64..96].copy_from_slice(self.message_passer_storage_root.as_slice());
        out[96..].copy_from_slice(self.block_hash.as_slice());
        out
    }

    /// Decodes an output produced by [`OutputV0::encode`].
    pub fn decode(data: &[u8]) -> Result<Self, OutputV0Error> {
        if data.len() != Self::ENCODED_LENGTH {
            return Err(OutputV0Error::InvalidLength(data.len()));
        }

        let version = B256::from_slice(&data[..32]);
        if version != Self::VERSION {
            return Err(OutputV0Error::UnsupportedVersion(version));
        }

        Ok(Self {
            state_root: B256::from_slice(&data[32..64]),
            message_passer_storage_root: B256::from_slice(&data[64..96]),
            block_hash: B256::from_slice(&data[96..]),
        })
    }

    /// Returns the output root, `keccak256(encode())`.
    pub fn output_root(&self) -> B256 {
        keccak256(self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn output() -> OutputV0 {
        OutputV0::new(B256::from([1u8; 32]), B256::from([2u8; 32]), B256::from([3u8; 32]))
    }

    #[test]
    fn test_decode_encoded_output() {
        let output = output();
        assert_eq!(OutputV0::decode(&output.encode()), Ok(output));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert_eq!(OutputV0::decode(&[0u8; 96]), Err(OutputV0Error::InvalidLength(96)));

        let mut encoded = output().encode();
        encoded[31] = 1;
        assert!(matches!(
            OutputV0::decode(&encoded),
            Err(OutputV0Error::UnsupportedVersion(_))
        ));
    }

    #[test]
    fn test_output_root_commits_to_every_field() {
        let base = output();
        let mut other = base;
        other.block_hash = B256::from([4u8; 32]);
        assert_ne!(base.output_root(), other.output_root());
        assert_eq!(base.output_root(), keccak256(base.encode()));
    }
}
