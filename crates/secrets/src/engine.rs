//! The three document operations: encrypt, decrypt and read.

use eh_common::{ControlBlock, Result, SecretsError};
use tracing::info;

use crate::document::Document;
use crate::header;
use crate::include;
use crate::keys::{envelope, EncryptionKey, OpenPolicy};
use crate::settings::Settings;
use crate::transport::{Transport, UrlTransport};
use crate::walker::{self, Operation};

/// Entry point for document operations.
///
/// Each call parses its own copy of the document and owns it, and the key
/// material, until the output text is produced.
#[derive(Debug)]
pub struct Engine<T = UrlTransport> {
    pub(crate) transport: T,
    pub(crate) settings: Settings,
}

impl<T: Transport> Engine<T> {
    pub fn new(transport: T, settings: Settings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Encrypt the protected fields of `input` under a freshly generated key.
    ///
    /// # Errors
    ///
    /// [`SecretsError::Shape`] if the document has no control block,
    /// [`SecretsError::State`] if it is already encrypted, plus parse, key
    /// service and walk failures.
    pub async fn encrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut doc = parse_document(input)?;
        let control = header::read(&doc)?.ok_or_else(header::missing_block)?;

        let key = envelope::seal(&control, &self.settings).await?;
        let count = walk_with(&mut doc, Operation::Encrypt, &control, &key)?;
        header::write_key(&mut doc, &key.to_wrapped())?;

        info!(fields = count, kid = %key.kid, "encrypted document");
        Ok(doc.to_string().into_bytes())
    }

    /// Decrypt the protected fields of `input` and reset its control block.
    ///
    /// # Errors
    ///
    /// [`SecretsError::Shape`] if the document has no control block,
    /// [`SecretsError::State`] if it is not encrypted, plus parse, codec and
    /// key service failures.
    pub async fn decrypt(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut doc = parse_document(input)?;
        self.decrypt_with_header(&mut doc, OpenPolicy::RequireEncrypted)
            .await?;
        Ok(doc.to_string().into_bytes())
    }

    /// Fetch `location`, decrypt it if needed, drop its control block and
    /// append every included fragment, recursively.
    ///
    /// # Errors
    ///
    /// Any failure of a fragment, wrapped with the fragment's location.
    /// [`SecretsError::IncludeCycle`] if an include chain loops or grows
    /// deeper than [`Settings::max_include_depth`].
    pub async fn read(&self, location: &str) -> Result<Vec<u8>> {
        let text = include::resolve_root(self, location).await?;
        Ok(text.into_bytes())
    }

    /// Decrypt `doc` in place and return its control block.
    ///
    /// A document without a control block is an error under
    /// [`OpenPolicy::RequireEncrypted`] and is returned untouched otherwise.
    pub(crate) async fn decrypt_with_header(
        &self,
        doc: &mut Document,
        policy: OpenPolicy,
    ) -> Result<Option<ControlBlock>> {
        let Some(control) = header::read(doc)? else {
            return match policy {
                OpenPolicy::RequireEncrypted => Err(header::missing_block()),
                OpenPolicy::AllowPlaintext => Ok(None),
            };
        };

        if let Some(key) = envelope::open(&control, &self.settings, policy).await? {
            let count = walk_with(doc, Operation::Decrypt, &control, &key)?;
            header::clear_key(doc)?;
            info!(fields = count, kid = %key.kid, "decrypted document");
        }
        Ok(Some(control))
    }
}

pub(crate) fn parse_document(input: &[u8]) -> Result<Document> {
    let text = std::str::from_utf8(input)
        .map_err(|e| SecretsError::Parse(format!("document is not UTF-8: {e}")))?;
    Document::parse(text).map_err(|e| SecretsError::Parse(e.to_string()))
}

fn walk_with(
    doc: &mut Document,
    op: Operation,
    control: &ControlBlock,
    key: &EncryptionKey,
) -> Result<usize> {
    let plaintext = key
        .plaintext()
        .map_err(|e| SecretsError::backend(control.service.kind.clone(), e))?;
    walker::walk(doc, op, &control.protect_set(), plaintext.as_bytes())
}
