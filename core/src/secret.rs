//! Swap secret generation and hash-lock verification.

use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::types::{decode_hex32, to_array, BYTES32_LEN};
use crate::{HashLock, Result, SwapError};

/// The 32-byte preimage of a swap's [`HashLock`].
///
/// Revealing it authorizes a claim on both legs, so `Debug` never prints it
/// and there is no `Display` impl. Use [`Secret::expose_hex`] when it really
/// has to leave the process.
#[derive(Clone)]
pub struct Secret([u8; BYTES32_LEN]);

impl Secret {
    pub const fn from_bytes(bytes: [u8; BYTES32_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        to_array(bytes).map(Self)
    }

    pub const fn expose(&self) -> &[u8; BYTES32_LEN] {
        &self.0
    }

    /// Lowercase hex of the raw secret.
    pub fn expose_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Computes `SHA-256(secret)`.
    pub fn hash_lock(&self) -> HashLock {
        HashLock::from_bytes(Sha256::digest(self.0).into())
    }
}

impl ConstantTimeEq for Secret {
    fn ct_eq(&self, other: &Self) -> subtle::Choice {
        self.0.ct_eq(&other.0)
    }
}

impl PartialEq for Secret {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for Secret {}

impl std::fmt::Debug for Secret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

impl std::str::FromStr for Secret {
    type Err = SwapError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        decode_hex32(s).map(Self)
    }
}

impl Serialize for Secret {
    fn serialize<S>(&self, s: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.expose_hex())
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(d: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(de::Error::custom)
    }
}

impl HashLock {
    /// Verifies that `SHA-256(secret) == self` using constant-time comparison.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::HashMismatch`] if the computed hash does not match.
    pub fn ensure_matches(&self, secret: &Secret) -> Result<()> {
        SecretVault::verify(secret, self)
            .then_some(())
            .ok_or(SwapError::HashMismatch)
    }
}

/// Source of swap secrets and their hash-locks.
///
/// # Example
///
/// ```
/// use hashswap_core::SecretVault;
///
/// let (secret, hash_lock) = SecretVault::generate().unwrap();
/// assert!(SecretVault::verify(&secret, &hash_lock));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretVault;

impl SecretVault {
    /// Draws a fresh secret from the operating system CSPRNG.
    ///
    /// # Errors
    ///
    /// Returns [`SwapError::RandomnessFailure`] if the OS source fails.
    /// There is no fallback to a weaker generator.
    pub fn generate() -> Result<(Secret, HashLock)> {
        Self::generate_with(&mut OsRng)
    }

    /// Same as [`SecretVault::generate`] with a caller-supplied CSPRNG.
    pub fn generate_with<R>(rng: &mut R) -> Result<(Secret, HashLock)>
    where
        R: RngCore + CryptoRng,
    {
        let mut bytes = [0u8; BYTES32_LEN];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|e| SwapError::RandomnessFailure(e.to_string()))?;
        let secret = Secret::from_bytes(bytes);
        let hash_lock = secret.hash_lock();
        Ok((secret, hash_lock))
    }

    /// Returns `true` iff `SHA-256(secret) == expected`.
    pub fn verify(secret: &Secret, expected: &HashLock) -> bool {
        let computed = Sha256::digest(secret.expose());
        computed
            .as_slice()
            .ct_eq(expected.as_bytes())
            .unwrap_u8()
            .eq(&1)
    }
}
