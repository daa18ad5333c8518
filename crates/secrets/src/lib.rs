//! Selective field encryption for HCL configuration documents.
//!
//! A document names the fields it protects in a reserved `eh` block. The
//! [`Engine`] encrypts and decrypts those fields in place, leaving every other
//! byte of the file as written, and merges included documents into one
//! decrypted text on [`Engine::read`].
//!
//! # Layout
//!
//! - [`document`]: lossless HCL parser and printer.
//! - [`crypto`]: AES-256-GCM-SIV field encryption.
//! - [`keys`]: key services (`local`, `awskms`) and the envelope-key lifecycle.
//! - [`walker`]: protected-field traversal.
//! - [`header`]: control-block reading and rewriting.
//! - [`transport`]: fetching documents from stdin, files, HTTP(S) and S3.

pub mod aws;
pub mod crypto;
pub mod document;
pub mod engine;
pub mod header;
pub mod include;
pub mod keys;
pub mod settings;
pub mod transport;
pub mod walker;

pub use engine::Engine;
pub use settings::Settings;
pub use transport::{MemoryTransport, Transport, UrlTransport};
