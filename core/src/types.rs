//! Fixed-length 32-byte values exchanged between both legs of a swap.

use crate::{Result, SwapError};

/// Number of bytes in a secret, hash-lock or contract swap id.
pub const BYTES32_LEN: usize = 32;

/// Decodes a hex string (optional `0x` prefix, either case) into 32 bytes.
pub(crate) fn decode_hex32(s: &str) -> Result<[u8; BYTES32_LEN]> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let bytes = hex::decode(digits)?;
    to_array(&bytes)
}

pub(crate) fn to_array(bytes: &[u8]) -> Result<[u8; BYTES32_LEN]> {
    bytes.try_into().map_err(|_| SwapError::InvalidLength {
        expected: BYTES32_LEN,
        actual: bytes.len(),
    })
}

macro_rules! bytes32 {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            serde_with::SerializeDisplay,
            serde_with::DeserializeFromStr,
        )]
        pub struct $name([u8; BYTES32_LEN]);

        impl $name {
            pub const fn from_bytes(bytes: [u8; BYTES32_LEN]) -> Self {
                Self(bytes)
            }

            /// Builds the value from a byte slice that must be exactly 32 bytes long.
            pub fn from_slice(bytes: &[u8]) -> Result<Self> {
                to_array(bytes).map(Self)
            }

            pub const fn as_bytes(&self) -> &[u8; BYTES32_LEN] {
                &self.0
            }

            /// Lowercase hex without a `0x` prefix.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl From<[u8; BYTES32_LEN]> for $name {
            fn from(bytes: [u8; BYTES32_LEN]) -> Self {
                Self(bytes)
            }
        }

        impl From<$name> for [u8; BYTES32_LEN] {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.to_hex())
            }
        }

        impl std::str::FromStr for $name {
            type Err = SwapError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                decode_hex32(s).map(Self)
            }
        }
    };
}

bytes32!(
    /// Public commitment gating the HTLC on both chains: `SHA-256(secret)`.
    HashLock
);

bytes32!(
    /// Identifier the EVM HTLC contract assigns to a created swap.
    ContractSwapId
);
