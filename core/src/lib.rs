/// Refund eligibility classification
pub mod eligibility;
pub mod error;
/// JSON file helpers
pub mod interface;
/// Persisted per-swap state
pub mod record;
/// Secret generation and hash-lock verification
pub mod secret;
/// Typed swap record storage
pub mod store;
/// 32-byte hex-encoded values
pub mod types;

pub use eligibility::{evaluate, unix_now, Amounts, EligibilityState};
pub use error::{RecordError, SwapError};
pub use record::{Network, SwapRecord};
pub use secret::{Secret, SecretVault};
pub use store::{JsonFileStore, MemoryStore, SwapStore};
pub use types::{ContractSwapId, HashLock};

pub type Result<T> = std::result::Result<T, SwapError>;
