//! Reading and rewriting the reserved `eh` control block.
//!
//! Field names inside the block are matched case-insensitively with
//! underscores ignored, so `masterKey`, `masterkey` and `master_key` are the
//! same field. Fields the block does not define are ignored.

use std::collections::BTreeSet;

use eh_common::{
    ControlBlock, Result, SecretsError, ServiceParams, WrappedKey, CONTROL_BLOCK_NAME,
};

use crate::document::{
    quote, unquote, Document, Node, ObjectItem, ObjectList, ObjectType, Token, TokenKind,
};

const BLOCK_FIELDS: &[&str] = &["encrypted", "key", "protect", "include", "service"];
const SERVICE_FIELDS: &[&str] = &["type", "region", "masterkey"];

/// Decode the control block, or `None` when the document has none.
///
/// # Errors
///
/// [`SecretsError::Shape`] if there is more than one `eh` item, if it is not a
/// block, or if a known field is repeated or holds the wrong kind of value.
pub fn read(doc: &Document) -> Result<Option<ControlBlock>> {
    let Some(item) = find(doc)? else {
        return Ok(None);
    };
    let list = match &item.value {
        Node::Object(obj) => &obj.list,
        _ => return Err(not_a_block()),
    };

    let mut block = ControlBlock::default();
    for (name, field) in known_fields(list, CONTROL_BLOCK_NAME, BLOCK_FIELDS)? {
        let path = format!("{CONTROL_BLOCK_NAME}.{name}");
        match name {
            "encrypted" => block.encrypted = bool_value(field, &path)?,
            "key" => block.key = string_value(field, &path)?,
            "protect" => block.protect = string_list(field, &path)?,
            "include" => block.include = string_list(field, &path)?,
            _ => block.service = service(field, &path)?,
        }
    }
    Ok(Some(block))
}

/// Record `wrapped` as the document's key and mark the document encrypted.
///
/// # Errors
///
/// [`SecretsError::Shape`] if the document has no usable control block;
/// [`SecretsError::Codec`] if the key cannot be serialised.
pub fn write_key(doc: &mut Document, wrapped: &WrappedKey) -> Result<()> {
    let encoded = wrapped.encode()?;
    let block = block_mut(doc)?;
    set_field(block, "key", TokenKind::String, quote(&encoded));
    set_field(block, "encrypted", TokenKind::Bool, "true".into());
    Ok(())
}

/// Reset the key to `""` and mark the document as plaintext.
///
/// # Errors
///
/// [`SecretsError::Shape`] if the document has no usable control block.
pub fn clear_key(doc: &mut Document) -> Result<()> {
    let block = block_mut(doc)?;
    set_field(block, "key", TokenKind::String, quote(""));
    set_field(block, "encrypted", TokenKind::Bool, "false".into());
    Ok(())
}

/// Remove the control block. Returns `false` if there was none.
pub fn strip(doc: &mut Document) -> bool {
    doc.remove_item(CONTROL_BLOCK_NAME).is_some()
}

fn find(doc: &Document) -> Result<Option<&ObjectItem>> {
    let mut found = doc
        .body
        .items
        .iter()
        .filter(|item| item.is_named(CONTROL_BLOCK_NAME));
    let first = found.next();
    if found.next().is_some() {
        return Err(SecretsError::Shape(format!(
            "document has more than one {CONTROL_BLOCK_NAME} block"
        )));
    }
    Ok(first)
}

fn block_mut(doc: &mut Document) -> Result<&mut ObjectType> {
    if find(doc)?.is_none() {
        return Err(missing_block());
    }
    let item = doc
        .body
        .items
        .iter_mut()
        .find(|item| item.is_named(CONTROL_BLOCK_NAME))
        .ok_or_else(missing_block)?;
    match &mut item.value {
        Node::Object(obj) => Ok(obj),
        _ => Err(not_a_block()),
    }
}

pub(crate) fn missing_block() -> SecretsError {
    SecretsError::Shape(format!("document has no {CONTROL_BLOCK_NAME} block"))
}

fn not_a_block() -> SecretsError {
    SecretsError::Shape(format!("{CONTROL_BLOCK_NAME} must be a block"))
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// The single-key items of `list` whose names are in `known`, checked for repeats.
fn known_fields<'a>(
    list: &'a ObjectList,
    scope: &str,
    known: &[&'static str],
) -> Result<Vec<(&'static str, &'a ObjectItem)>> {
    let mut seen = BTreeSet::new();
    let mut fields = Vec::new();
    for item in list.items.iter().filter(|item| item.keys.len() == 1) {
        let normalized = normalize(&item.name());
        let Some(name) = known.iter().copied().find(|k| *k == normalized) else {
            continue;
        };
        if !seen.insert(name) {
            return Err(SecretsError::Shape(format!(
                "field {name:?} is set more than once in {scope}"
            )));
        }
        fields.push((name, item));
    }
    Ok(fields)
}

fn bool_value(item: &ObjectItem, path: &str) -> Result<bool> {
    match &item.value {
        Node::Literal(token) if token.kind == TokenKind::Bool => Ok(token.text == "true"),
        _ => Err(SecretsError::Shape(format!("{path} must be a bool"))),
    }
}

fn string_value(item: &ObjectItem, path: &str) -> Result<String> {
    match &item.value {
        Node::Literal(token) => string_token(token, path),
        _ => Err(SecretsError::Shape(format!("{path} must be a string"))),
    }
}

fn string_token(token: &Token, path: &str) -> Result<String> {
    if token.kind != TokenKind::String {
        return Err(SecretsError::Shape(format!("{path} must be a string")));
    }
    unquote(&token.text).map_err(|e| SecretsError::Shape(format!("{path}: {e}")))
}

fn string_list(item: &ObjectItem, path: &str) -> Result<Vec<String>> {
    let Node::List(list) = &item.value else {
        return Err(SecretsError::Shape(format!("{path} must be a list of strings")));
    };
    list.elements
        .iter()
        .map(|element| match &element.value {
            Node::Literal(token) => string_token(token, path),
            _ => Err(SecretsError::Shape(format!("{path} must be a list of strings"))),
        })
        .collect()
}

fn service(item: &ObjectItem, path: &str) -> Result<ServiceParams> {
    let Node::Object(obj) = &item.value else {
        return Err(SecretsError::Shape(format!("{path} must be a block")));
    };
    let mut params = ServiceParams::default();
    for (name, field) in known_fields(&obj.list, path, SERVICE_FIELDS)? {
        let value = string_value(field, &format!("{path}.{name}"))?;
        match name {
            "type" => params.kind = value,
            "region" => params.region = value,
            _ => params.master_key = value,
        }
    }
    Ok(params)
}

fn first_token(node: &Node) -> &Token {
    match node {
        Node::Object(obj) => &obj.lbrace,
        Node::List(list) => &list.lbracket,
        Node::Literal(token) | Node::Identifier(token) => token,
    }
}

/// Replace the value of field `name`, or insert `name = text` at the top of the block.
fn set_field(block: &mut ObjectType, name: &str, kind: TokenKind, text: String) {
    let existing = block
        .list
        .items
        .iter_mut()
        .find(|item| item.keys.len() == 1 && normalize(&item.name()) == name);
    if let Some(item) = existing {
        let leading = first_token(&item.value).leading.clone();
        item.value = Node::Literal(Token::synthetic(kind, leading, text));
        return;
    }

    let leading = insertion_leading(block);
    block.list.items.insert(
        0,
        ObjectItem {
            keys: vec![Token::synthetic(TokenKind::Ident, leading, name)],
            assign: Some(Token::synthetic(TokenKind::Assign, " ", "=")),
            value: Node::Literal(Token::synthetic(kind, " ", text)),
            comma: None,
        },
    );
}

/// Whitespace placing a new first item on its own line at the block's indentation.
fn insertion_leading(block: &mut ObjectType) -> String {
    let after_newline = |trivia: &str| trivia.rfind('\n').map(|i| trivia[i + 1..].to_owned());
    match block.list.items.first() {
        Some(first) => match after_newline(&first.keys[0].leading) {
            Some(indent) => format!("\n{indent}"),
            None => " ".into(),
        },
        None => match after_newline(&block.rbrace.leading) {
            Some(indent) => format!("\n{indent}  "),
            None => {
                if block.rbrace.leading.is_empty() {
                    block.rbrace.leading = " ".into();
                }
                " ".into()
            }
        },
    }
}
