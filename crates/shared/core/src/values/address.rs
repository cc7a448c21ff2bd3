use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for derived program addresses
const ADDRESS_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2d0e_8a4b_4c57_9e3a_5b7d_2f10_c4e8);

/// Account address (signer, authority, vault or mint)
///
/// Addresses are opaque strings. Program-owned accounts (pools, mints,
/// vaults, the treasury) are derived deterministically from a seed so the
/// same inputs always resolve to the same account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Create an address from any string
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Derive a program address from a namespace label and seed bytes
    pub fn derive(label: &str, seed: &[u8]) -> Self {
        let mut name = Vec::with_capacity(label.len() + 1 + seed.len());
        name.extend_from_slice(label.as_bytes());
        name.push(b':');
        name.extend_from_slice(seed);
        Self(Uuid::new_v5(&ADDRESS_NAMESPACE, &name).to_string())
    }

    /// Get the address as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
