//! AES-256-GCM-SIV field encryption primitives.
//!
//! This module is intentionally free of AWS and document dependencies.
//! It provides the low-level encrypt/decrypt operations used by the field walker.
//!
//! # Ciphertext format
//!
//! ```text
//! base64url-no-pad( nonce[12] ‖ ciphertext ‖ tag[16] )
//! ```

pub mod cipher;

pub use cipher::{decrypt_field, encrypt_field, CipherError, EncryptedField, KEY_LEN};
