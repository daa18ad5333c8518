//! Error taxonomy shared by the engine and the CLI.

use thiserror::Error;

/// Boxed error carried by variants that wrap a collaborator's own failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Coarse classification of a [`SecretsError`].
///
/// Kinds map to process exit codes returned by the CLI (sysexits values):
/// - data errors (parse, shape, state, codec, cycle) → 65
/// - [`ErrorKind::Fetch`] → 66
/// - [`ErrorKind::Backend`] → 69
/// - [`ErrorKind::Config`] → 78
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Shape,
    State,
    Codec,
    Backend,
    Fetch,
    Config,
    Cycle,
}

impl ErrorKind {
    /// Returns the process exit code that should be used for this kind.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Parse
            | ErrorKind::Shape
            | ErrorKind::State
            | ErrorKind::Codec
            | ErrorKind::Cycle => 65,
            ErrorKind::Fetch => 66,
            ErrorKind::Backend => 69,
            ErrorKind::Config => 78,
        }
    }
}

/// Top-level error type for every Encrypt, Decrypt and Read operation.
///
/// A single failure aborts the whole document operation; nothing is retried
/// and no partial output is produced.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// The document text is not valid HCL.
    #[error("failed to parse document: {0}")]
    Parse(String),

    /// The control block is missing, duplicated or malformed, or the document
    /// contains a node the walker does not support.
    #[error("invalid document shape: {0}")]
    Shape(String),

    /// The operation does not apply to the document's current state, e.g.
    /// encrypting an already-encrypted document.
    #[error("{0}")]
    State(String),

    /// A stored value could not be decoded or authenticated.
    #[error("failed to decode {field:?}: {reason}")]
    Codec { field: String, reason: String },

    /// The key-management backend failed. The backend error is kept as the source.
    #[error("key service {service:?} failed")]
    Backend {
        service: String,
        #[source]
        source: BoxError,
    },

    /// The transport could not fetch a document.
    #[error("failed to fetch {location:?}")]
    Fetch {
        location: String,
        #[source]
        source: BoxError,
    },

    /// The control block names an unusable key service configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// An include chain refers back to a document that is still being resolved,
    /// or exceeds the configured depth.
    #[error("include cycle: {0}")]
    IncludeCycle(String),

    /// A failure while resolving an included fragment.
    #[error("failed to include {location:?}")]
    Include {
        location: String,
        #[source]
        source: Box<SecretsError>,
    },

    /// A failure while decoding the fetched document at `location`.
    #[error("failed to decrypt {location:?}")]
    Document {
        location: String,
        #[source]
        source: Box<SecretsError>,
    },
}

impl SecretsError {
    /// Construct a [`SecretsError::Codec`] for the named field.
    pub fn codec(field: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        SecretsError::Codec {
            field: field.into(),
            reason: reason.to_string(),
        }
    }

    /// Construct a [`SecretsError::Backend`] wrapping the backend's own error.
    pub fn backend(service: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SecretsError::Backend {
            service: service.into(),
            source: source.into(),
        }
    }

    /// Construct a [`SecretsError::Fetch`] for the given location.
    pub fn fetch(location: impl Into<String>, source: impl Into<BoxError>) -> Self {
        SecretsError::Fetch {
            location: location.into(),
            source: source.into(),
        }
    }

    /// Wrap `self` as the failure of including `location`.
    pub fn included_from(self, location: impl Into<String>) -> Self {
        SecretsError::Include {
            location: location.into(),
            source: Box::new(self),
        }
    }

    /// Wrap `self` as the failure of decoding the document at `location`.
    pub fn in_document(self, location: impl Into<String>) -> Self {
        SecretsError::Document {
            location: location.into(),
            source: Box::new(self),
        }
    }

    /// Classify this error. Include wrappers report the kind of the innermost failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SecretsError::Parse(_) => ErrorKind::Parse,
            SecretsError::Shape(_) => ErrorKind::Shape,
            SecretsError::State(_) => ErrorKind::State,
            SecretsError::Codec { .. } => ErrorKind::Codec,
            SecretsError::Backend { .. } => ErrorKind::Backend,
            SecretsError::Fetch { .. } => ErrorKind::Fetch,
            SecretsError::Config(_) => ErrorKind::Config,
            SecretsError::IncludeCycle(_) => ErrorKind::Cycle,
            SecretsError::Include { source, .. } | SecretsError::Document { source, .. } => {
                source.kind()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(ErrorKind::Parse.exit_code(), 65);
        assert_eq!(ErrorKind::Codec.exit_code(), 65);
        assert_eq!(ErrorKind::Fetch.exit_code(), 66);
        assert_eq!(ErrorKind::Backend.exit_code(), 69);
        assert_eq!(ErrorKind::Config.exit_code(), 78);
    }

    #[test]
    fn include_reports_inner_kind() {
        let inner = SecretsError::State("contents is not encrypted".into());
        let outer = inner.included_from("./a.hcl").included_from("./b.hcl");
        assert_eq!(outer.kind(), ErrorKind::State);
        assert!(outer.to_string().contains("./b.hcl"));
    }

    #[test]
    fn document_wrapper_names_location() {
        let e = SecretsError::Parse("line 1, column 5: expected value".into())
            .in_document("conf/root.hcl");
        assert_eq!(e.kind(), ErrorKind::Parse);
        assert_eq!(e.to_string(), "failed to decrypt \"conf/root.hcl\"");
    }

    #[test]
    fn codec_display_names_field() {
        let e = SecretsError::codec("password", "invalid base64");
        assert!(e.to_string().contains("\"password\""));
        assert!(e.to_string().contains("invalid base64"));
    }

    #[test]
    fn backend_keeps_source() {
        use std::error::Error as _;
        let io = std::io::Error::new(std::io::ErrorKind::Other, "kms unreachable");
        let e = SecretsError::backend("awskms", io);
        assert_eq!(e.kind(), ErrorKind::Backend);
        assert!(e.source().unwrap().to_string().contains("kms unreachable"));
    }
}
