//! Common types, control-block definitions, and errors shared across `eh` crates.

pub mod error;
pub mod protocol;

pub use error::{ErrorKind, Result, SecretsError};
pub use protocol::{ControlBlock, ServiceParams, WrappedKey, CONTROL_BLOCK_NAME};
