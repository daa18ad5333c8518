//! Fetching documents by location.
//!
//! | location                     | source                 |
//! |------------------------------|------------------------|
//! | `""` or `"-"`                | standard input         |
//! | `file://<path>`, bare path   | local file             |
//! | `http://…`, `https://…`      | HTTP GET               |
//! | `s3://<bucket>/<key>`        | S3 `GetObject`         |

pub mod memory;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use eh_common::error::BoxError;
use thiserror::Error;

pub use memory::MemoryTransport;
pub use url::UrlTransport;

/// Errors produced while fetching a document.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("server responded with status {0}")]
    Status(u16),

    #[error("S3 request failed")]
    S3(#[source] BoxError),

    #[error("unsupported location scheme {0:?}")]
    UnsupportedScheme(String),

    #[error("invalid location: {0}")]
    InvalidLocation(String),

    /// Nothing is stored under the location (in-memory transport).
    #[error("no document at this location")]
    NotFound,
}

/// Source of document bytes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<Bytes, FetchError>;
}

/// A parsed location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location<'a> {
    Stdin,
    File(&'a str),
    Http(&'a str),
    S3 { bucket: &'a str, key: &'a str },
}

impl<'a> Location<'a> {
    /// Classify `location` by scheme.
    ///
    /// # Errors
    ///
    /// [`FetchError::UnsupportedScheme`] for a scheme other than `file`, `http`,
    /// `https` or `s3`; [`FetchError::InvalidLocation`] for an S3 URL without
    /// both a bucket and a key.
    pub fn parse(location: &'a str) -> Result<Self, FetchError> {
        if location.is_empty() || location == "-" {
            return Ok(Location::Stdin);
        }
        let Some((scheme, rest)) = location.split_once("://") else {
            return Ok(Location::File(location));
        };
        match scheme {
            "file" => Ok(Location::File(rest)),
            "http" | "https" => Ok(Location::Http(location)),
            "s3" => match rest.split_once('/') {
                Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                    Ok(Location::S3 { bucket, key })
                }
                _ => Err(FetchError::InvalidLocation(format!(
                    "{location} does not name a bucket and key"
                ))),
            },
            other => Err(FetchError::UnsupportedScheme(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_each_scheme() {
        assert_eq!(Location::parse("").unwrap(), Location::Stdin);
        assert_eq!(Location::parse("-").unwrap(), Location::Stdin);
        assert_eq!(Location::parse("conf/app.hcl").unwrap(), Location::File("conf/app.hcl"));
        assert_eq!(
            Location::parse("file:///etc/app.hcl").unwrap(),
            Location::File("/etc/app.hcl")
        );
        assert_eq!(
            Location::parse("https://example.com/a.hcl").unwrap(),
            Location::Http("https://example.com/a.hcl")
        );
        assert_eq!(
            Location::parse("s3://bucket/dir/a.hcl").unwrap(),
            Location::S3 {
                bucket: "bucket",
                key: "dir/a.hcl"
            }
        );
    }

    #[test]
    fn rejects_unknown_scheme() {
        assert!(matches!(
            Location::parse("ftp://host/a.hcl"),
            Err(FetchError::UnsupportedScheme(s)) if s == "ftp"
        ));
    }

    #[test]
    fn rejects_incomplete_s3_url() {
        for location in ["s3://bucket", "s3://bucket/", "s3:///key"] {
            assert!(matches!(
                Location::parse(location),
                Err(FetchError::InvalidLocation(_))
            ));
        }
    }
}
