//! Recursive include resolution for `read`.
//!
//! Every fragment goes through the same steps: fetch, decrypt when encrypted,
//! strip the control block, print, then append each of its own includes in
//! order, each preceded by a `// <location>` marker line.

use std::future::Future;
use std::pin::Pin;

use eh_common::{ControlBlock, Result, SecretsError};
use tracing::debug;

use crate::document::Document;
use crate::engine::{parse_document, Engine};
use crate::header;
use crate::keys::OpenPolicy;
use crate::transport::Transport;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Resolve `name` as listed in the include list of the document at `base`.
///
/// A `./` prefix is relative to the directory of `base`; anything else is
/// used as written. The scheme and authority of a URL base are never cut.
pub fn resolve_location(base: &str, name: &str) -> String {
    let Some(relative) = name.strip_prefix("./") else {
        return name.to_owned();
    };
    let path_start = base
        .find("://")
        .map_or(0, |i| base[i + 3..].find('/').map_or(base.len(), |j| i + 3 + j));
    match base[path_start..].rfind('/') {
        Some(i) => format!("{}/{relative}", &base[..path_start + i]),
        None if path_start > 0 => format!("{}/{relative}", &base[..path_start]),
        None => relative.to_owned(),
    }
}

pub(crate) async fn resolve_root<T: Transport>(
    engine: &Engine<T>,
    location: &str,
) -> Result<String> {
    let mut chain = Vec::new();
    resolve(engine, location.to_owned(), &mut chain).await
}

/// `chain` holds the locations currently being resolved, outermost first.
fn resolve<'a, T: Transport>(
    engine: &'a Engine<T>,
    location: String,
    chain: &'a mut Vec<String>,
) -> BoxFuture<'a, Result<String>> {
    Box::pin(async move {
        if chain.contains(&location) {
            return Err(SecretsError::IncludeCycle(format!(
                "{} -> {location}",
                chain.join(" -> ")
            )));
        }
        let max_depth = engine.settings.max_include_depth;
        if chain.len() > max_depth {
            return Err(SecretsError::IncludeCycle(format!(
                "{location} is nested more than {max_depth} includes deep"
            )));
        }

        debug!(location = %location, depth = chain.len(), "reading document");
        let bytes = engine
            .transport
            .fetch(&location)
            .await
            .map_err(|e| SecretsError::fetch(location.clone(), e))?;
        // Nested fragments are named by the include wrapper of their parent.
        let (doc, control) = load(engine, &bytes).await.map_err(|e| {
            if chain.is_empty() {
                e.in_document(location.clone())
            } else {
                e
            }
        })?;

        let mut out = doc.to_string();
        let includes = control.map(|c| c.include).unwrap_or_default();

        chain.push(location.clone());
        for name in includes {
            let resolved = resolve_location(&location, &name);
            let fragment = resolve(engine, resolved.clone(), chain)
                .await
                .map_err(|e| e.included_from(resolved.clone()))?;
            out.push_str("\n\n// ");
            out.push_str(&resolved);
            out.push('\n');
            out.push_str(&fragment);
        }
        chain.pop();

        Ok(out)
    })
}

/// Parse and decrypt a fetched fragment, then strip its control block.
async fn load<T: Transport>(
    engine: &Engine<T>,
    bytes: &[u8],
) -> Result<(Document, Option<ControlBlock>)> {
    let mut doc = parse_document(bytes)?;
    let control = engine
        .decrypt_with_header(&mut doc, OpenPolicy::AllowPlaintext)
        .await?;
    header::strip(&mut doc);
    Ok((doc, control))
}
