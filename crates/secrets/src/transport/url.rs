//! The production [`Transport`]: stdin, files, HTTP(S) and S3.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::aws::{s3_client, sdk_config};

use super::{FetchError, Location, Transport};

/// Fetches documents from any supported location.
///
/// The S3 client is only built the first time an `s3://` location is fetched,
/// so plain file and HTTP use never touches AWS configuration.
#[derive(Debug)]
pub struct UrlTransport {
    http: reqwest::Client,
    s3: OnceCell<aws_sdk_s3::Client>,
    s3_endpoint: Option<String>,
}

impl UrlTransport {
    /// # Errors
    ///
    /// [`FetchError::Http`] if the HTTP client cannot be initialised.
    pub fn new(timeout: Duration, s3_endpoint: Option<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            s3: OnceCell::new(),
            s3_endpoint,
        })
    }

    async fn s3(&self) -> &aws_sdk_s3::Client {
        self.s3
            .get_or_init(|| async {
                let config = sdk_config(None).await;
                s3_client(&config, self.s3_endpoint.as_deref())
            })
            .await
    }

    async fn fetch_http(&self, url: &str) -> Result<Bytes, FetchError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(resp.bytes().await?)
    }

    async fn fetch_s3(&self, bucket: &str, key: &str) -> Result<Bytes, FetchError> {
        let resp = self
            .s3()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| FetchError::S3(e.into()))?;
        let body = resp
            .body
            .collect()
            .await
            .map_err(|e| FetchError::S3(e.into()))?;
        Ok(body.into_bytes())
    }
}

#[async_trait]
impl Transport for UrlTransport {
    async fn fetch(&self, location: &str) -> Result<Bytes, FetchError> {
        let parsed = Location::parse(location)?;
        debug!(location, "fetching document");
        match parsed {
            Location::Stdin => {
                let mut buf = Vec::new();
                tokio::io::stdin().read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
            Location::File(path) => Ok(Bytes::from(tokio::fs::read(path).await?)),
            Location::Http(url) => self.fetch_http(url).await,
            Location::S3 { bucket, key } => self.fetch_s3(bucket, key).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> UrlTransport {
        UrlTransport::new(Duration::from_secs(5), None).unwrap()
    }

    /// Serve one HTTP request with `status` and `body`, returning the URL.
    async fn serve_once(status: &'static str, body: &'static str) -> String {
        use tokio::io::AsyncWriteExt;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}/conf/app.hcl")
    }

    #[tokio::test]
    async fn http_success_returns_body() {
        let url = serve_once("200 OK", "a = 1\n").await;
        assert_eq!(
            transport().fetch(&url).await.unwrap(),
            Bytes::from_static(b"a = 1\n")
        );
    }

    #[tokio::test]
    async fn http_error_status_is_a_fetch_error() {
        let url = serve_once("404 Not Found", "missing").await;
        let err = transport().fetch(&url).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(404)));
    }

    #[tokio::test]
    async fn reads_plain_and_file_url_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.hcl");
        std::fs::write(&path, "a = 1\n").unwrap();
        let path = path.to_str().unwrap();

        let t = transport();
        assert_eq!(t.fetch(path).await.unwrap(), Bytes::from_static(b"a = 1\n"));
        assert_eq!(
            t.fetch(&format!("file://{path}")).await.unwrap(),
            Bytes::from_static(b"a = 1\n")
        );
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.hcl");
        let err = transport()
            .fetch(missing.to_str().unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[tokio::test]
    async fn unsupported_scheme_fails_before_any_io() {
        let err = transport().fetch("gs://bucket/a.hcl").await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedScheme(_)));
    }
}
