//! Recursive-descent parser building the [`Document`] tree from tokens.

use std::iter::Peekable;
use std::vec::IntoIter;

use super::lexer::{tokenize, Token, TokenKind};
use super::{Document, ListElement, ListType, Node, ObjectItem, ObjectList, ObjectType, ParseError};

pub(super) fn parse(src: &str) -> Result<Document, ParseError> {
    let mut parser = Parser {
        tokens: tokenize(src)?.into_iter().peekable(),
    };
    let body = parser.object_list(TokenKind::Eof)?;
    let eof = parser.expect(TokenKind::Eof)?;
    Ok(Document { body, eof })
}

struct Parser {
    tokens: Peekable<IntoIter<Token>>,
}

impl Parser {
    fn peek_kind(&mut self) -> TokenKind {
        self.tokens.peek().map_or(TokenKind::Eof, |t| t.kind)
    }

    fn bump(&mut self) -> Result<Token, ParseError> {
        self.tokens
            .next()
            .ok_or_else(|| ParseError::new(0, 0, "unexpected end of token stream"))
    }

    fn unexpected(&mut self, expected: &str) -> ParseError {
        match self.tokens.peek() {
            Some(t) => ParseError::new(
                t.line,
                t.column,
                format!("expected {expected}, found {}", t.kind.describe()),
            ),
            None => ParseError::new(0, 0, format!("expected {expected}, found end of input")),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.peek_kind() == kind {
            self.bump()
        } else {
            Err(self.unexpected(kind.describe()))
        }
    }

    fn eat(&mut self, kind: TokenKind) -> Result<Option<Token>, ParseError> {
        if self.peek_kind() == kind {
            self.bump().map(Some)
        } else {
            Ok(None)
        }
    }

    /// Items up to (not including) `end`, which is `}` for objects or EOF for the file root.
    fn object_list(&mut self, end: TokenKind) -> Result<ObjectList, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.peek_kind() {
                kind if kind == end => return Ok(ObjectList { items }),
                TokenKind::Eof => return Err(self.unexpected(end.describe())),
                _ => items.push(self.object_item()?),
            }
        }
    }

    fn object_item(&mut self) -> Result<ObjectItem, ParseError> {
        let mut keys = Vec::new();
        while matches!(self.peek_kind(), TokenKind::Ident | TokenKind::String) {
            keys.push(self.bump()?);
        }
        if keys.is_empty() {
            return Err(self.unexpected("key"));
        }

        let (assign, value) = match self.peek_kind() {
            TokenKind::Assign if keys.len() == 1 => {
                let assign = self.bump()?;
                (Some(assign), self.value()?)
            }
            TokenKind::LBrace => (None, Node::Object(self.object()?)),
            _ if keys.len() > 1 => return Err(self.unexpected("'{'")),
            _ => return Err(self.unexpected("'=' or '{'")),
        };
        let comma = self.eat(TokenKind::Comma)?;
        Ok(ObjectItem {
            keys,
            assign,
            value,
            comma,
        })
    }

    fn value(&mut self) -> Result<Node, ParseError> {
        match self.peek_kind() {
            TokenKind::String | TokenKind::Number | TokenKind::Bool | TokenKind::Heredoc => {
                Ok(Node::Literal(self.bump()?))
            }
            TokenKind::Ident => Ok(Node::Identifier(self.bump()?)),
            TokenKind::LBrace => Ok(Node::Object(self.object()?)),
            TokenKind::LBracket => Ok(Node::List(self.list()?)),
            _ => Err(self.unexpected("value")),
        }
    }

    fn object(&mut self) -> Result<ObjectType, ParseError> {
        let lbrace = self.expect(TokenKind::LBrace)?;
        let list = self.object_list(TokenKind::RBrace)?;
        let rbrace = self.expect(TokenKind::RBrace)?;
        Ok(ObjectType {
            lbrace,
            list,
            rbrace,
        })
    }

    fn list(&mut self) -> Result<ListType, ParseError> {
        let lbracket = self.expect(TokenKind::LBracket)?;
        let mut elements = Vec::new();
        while self.peek_kind() != TokenKind::RBracket {
            let value = self.value()?;
            let comma = self.eat(TokenKind::Comma)?;
            let last = comma.is_none();
            elements.push(ListElement { value, comma });
            if last && self.peek_kind() != TokenKind::RBracket {
                return Err(self.unexpected("',' or ']'"));
            }
        }
        let rbracket = self.expect(TokenKind::RBracket)?;
        Ok(ListType {
            lbracket,
            elements,
            rbracket,
        })
    }
}
