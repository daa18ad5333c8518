//! Protected-field traversal.
//!
//! The walker visits every value in a document. A string literal is rewritten
//! when the name of the item that holds it is in the protect set; the name
//! carries down into list elements but not into nested objects, whose items
//! are matched by their own names. Items named `eh` are skipped wherever they
//! appear.

use std::collections::BTreeSet;

use eh_common::{Result, SecretsError, CONTROL_BLOCK_NAME};

use crate::crypto::{decrypt_field, encrypt_field, EncryptedField};
use crate::document::{quote, unquote, Document, Node, ObjectList, Token, TokenKind};

/// Direction of a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Encrypt,
    Decrypt,
}

/// Transform every protected string in `doc` with `key`.
///
/// Returns the number of values rewritten.
///
/// # Errors
///
/// [`SecretsError::Shape`] on a bare identifier in value position;
/// [`SecretsError::Codec`], naming the field's dotted path, when a value cannot
/// be unquoted, decoded, authenticated or read back as UTF-8.
pub fn walk(
    doc: &mut Document,
    op: Operation,
    protect: &BTreeSet<String>,
    key: &[u8],
) -> Result<usize> {
    let mut walker = Walker {
        op,
        protect,
        key,
        path: Vec::new(),
        count: 0,
    };
    walker.visit_list(&mut doc.body)?;
    Ok(walker.count)
}

struct Walker<'a> {
    op: Operation,
    protect: &'a BTreeSet<String>,
    key: &'a [u8],
    path: Vec<String>,
    count: usize,
}

impl Walker<'_> {
    fn visit_list(&mut self, list: &mut ObjectList) -> Result<()> {
        for item in &mut list.items {
            if item.is_named(CONTROL_BLOCK_NAME) {
                continue;
            }
            let name = item.name();
            self.path.push(name.clone());
            let visited = self.visit_node(&mut item.value, &name);
            self.path.pop();
            visited?;
        }
        Ok(())
    }

    fn visit_node(&mut self, node: &mut Node, name: &str) -> Result<()> {
        match node {
            Node::Object(obj) => self.visit_list(&mut obj.list),
            Node::List(list) => list
                .elements
                .iter_mut()
                .try_for_each(|element| self.visit_node(&mut element.value, name)),
            Node::Literal(token) => {
                if token.kind == TokenKind::String && self.protect.contains(name) {
                    self.transform(token)?;
                    self.count += 1;
                }
                Ok(())
            }
            Node::Identifier(token) => Err(SecretsError::Shape(format!(
                "unsupported value {} for {} at line {}, column {}",
                token.text,
                self.field(),
                token.line,
                token.column
            ))),
        }
    }

    fn transform(&self, token: &mut Token) -> Result<()> {
        let value = unquote(&token.text).map_err(|e| self.codec(e))?;
        let replaced = match self.op {
            Operation::Encrypt => encrypt_field(value.as_bytes(), self.key)
                .map_err(|e| self.codec(e))?
                .encode(),
            Operation::Decrypt => {
                let field = EncryptedField::decode(&value).map_err(|e| self.codec(e))?;
                let plaintext = decrypt_field(&field, self.key).map_err(|e| self.codec(e))?;
                String::from_utf8(plaintext).map_err(|_| self.codec("plaintext is not UTF-8"))?
            }
        };
        token.text = quote(&replaced);
        Ok(())
    }

    fn field(&self) -> String {
        self.path.join(".")
    }

    fn codec(&self, reason: impl std::fmt::Display) -> SecretsError {
        SecretsError::codec(self.field(), reason)
    }
}
