//! JSON-RPC error codes of the managed-mode API.

use core::fmt;

/// Error codes returned by the managed-mode API.
///
/// The supervisor relies on these to tell information-bearing failures (a missing or
/// conflicting block) apart from genuine faults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ManagedModeErrorCode {
    /// The requested block is not known to the node.
    BlockNotFound = -39001,
    /// The node holds a different block at the requested height.
    ConflictingBlock = -39002,
    /// Interop is not active for the requested operation.
    InteropInactive = -39003,
    /// The request parameters are malformed or inconsistent.
    InvalidParams = -32602,
    /// Any other failure.
    InternalError = -32603,
}

impl ManagedModeErrorCode {
    /// Returns the numeric JSON-RPC code.
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Maps a numeric JSON-RPC code back to a known [`ManagedModeErrorCode`].
    pub const fn from_code(code: i32) -> Option<Self> {
        match code {
            -39001 => Some(Self::BlockNotFound),
            -39002 => Some(Self::ConflictingBlock),
            -39003 => Some(Self::InteropInactive),
            -32602 => Some(Self::InvalidParams),
            -32603 => Some(Self::InternalError),
            _ => None,
        }
    }
}

impl From<ManagedModeErrorCode> for i32 {
    fn from(code: ManagedModeErrorCode) -> Self {
        code.code()
    }
}

impl fmt::Display for ManagedModeErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BlockNotFound => "block not found",
            Self::ConflictingBlock => "conflicting block",
            Self::InteropInactive => "interop inactive",
            Self::InvalidParams => "invalid params",
            Self::InternalError => "internal error",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_back() {
        for code in [
            ManagedModeErrorCode::BlockNotFound,
            ManagedModeErrorCode::ConflictingBlock,
            ManagedModeErrorCode::InteropInactive,
            ManagedModeErrorCode::InvalidParams,
            ManagedModeErrorCode::InternalError,
        ] {
            assert_eq!(ManagedModeErrorCode::from_code(code.code()), Some(code));
        }
        assert_eq!(ManagedModeErrorCode::from_code(-32000), None);
        assert_eq!(i32::from(ManagedModeErrorCode::BlockNotFound), -39001);
    }
}
