//! Lossless tokenizer.
//!
//! Every byte of the input ends up either in a token's `text` or in the
//! `leading` trivia (whitespace and comments) of the token that follows it.
//! The final [`TokenKind::Eof`] token carries any trailing trivia.

use super::ParseError;

/// Lexical class of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    String,
    Number,
    Bool,
    Heredoc,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Assign,
    Comma,
    Eof,
}

impl TokenKind {
    pub(crate) fn describe(self) -> &'static str {
        match self {
            TokenKind::Ident => "identifier",
            TokenKind::String => "string",
            TokenKind::Number => "number",
            TokenKind::Bool => "bool",
            TokenKind::Heredoc => "heredoc",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Assign => "'='",
            TokenKind::Comma => "','",
            TokenKind::Eof => "end of input",
        }
    }
}

/// A token together with the trivia that precedes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Whitespace and comments before the token, printed verbatim.
    pub leading: String,
    /// Source text of the token. Rewriting this is how literals are replaced.
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    /// A token that did not come from source text, e.g. an inserted header field.
    pub fn synthetic(kind: TokenKind, leading: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            leading: leading.into(),
            text: text.into(),
            line: 0,
            column: 0,
        }
    }
}

/// Split `src` into tokens, ending with an [`TokenKind::Eof`] token.
pub fn tokenize(src: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer {
        src,
        pos: 0,
        line: 1,
        column: 1,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.line, self.column, message)
    }

    fn skip_trivia(&mut self) -> Result<(), ParseError> {
        loop {
            match (self.peek(), self.peek_second()) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('#'), _) | (Some('/'), Some('/')) => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) => {
                    let (line, column) = (self.line, self.column);
                    self.bump();
                    self.bump();
                    loop {
                        match (self.peek(), self.peek_second()) {
                            (Some('*'), Some('/')) => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            (Some(_), _) => {
                                self.bump();
                            }
                            (None, _) => {
                                return Err(ParseError::new(
                                    line,
                                    column,
                                    "unterminated block comment",
                                ))
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        let trivia_start = self.pos;
        self.skip_trivia()?;
        let leading = self.src[trivia_start..self.pos].to_owned();

        let (line, column) = (self.line, self.column);
        let start = self.pos;
        let kind = match self.peek() {
            None => TokenKind::Eof,
            Some(c) => self.scan(c)?,
        };
        Ok(Token {
            kind,
            leading,
            text: self.src[start..self.pos].to_owned(),
            line,
            column,
        })
    }

    fn scan(&mut self, c: char) -> Result<TokenKind, ParseError> {
        let single = match c {
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '=' => Some(TokenKind::Assign),
            ',' => Some(TokenKind::Comma),
            _ => None,
        };
        if let Some(kind) = single {
            self.bump();
            return Ok(kind);
        }

        match c {
            '"' => self.scan_string(),
            '<' if self.peek_second() == Some('<') => self.scan_heredoc(),
            '-' | '0'..='9' => self.scan_number(),
            c if c.is_alphabetic() || c == '_' => Ok(self.scan_ident()),
            other => Err(self.error(format!("unexpected character {other:?}"))),
        }
    }

    fn scan_string(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        // Depth of `${ ... }` interpolation; quotes inside it do not end the string.
        let mut depth = 0usize;
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ParseError::new(line, column, "unterminated string literal"))
                }
                Some('\\') => {
                    if self.bump().is_none() {
                        return Err(ParseError::new(line, column, "unterminated string literal"));
                    }
                }
                Some('$') if self.peek() == Some('{') => {
                    self.bump();
                    depth += 1;
                }
                Some('{') if depth > 0 => depth += 1,
                Some('}') if depth > 0 => depth -= 1,
                Some('"') if depth > 0 => self.skip_nested_string(line, column)?,
                Some('"') => return Ok(TokenKind::String),
                Some(_) => {}
            }
        }
    }

    fn skip_nested_string(&mut self, line: usize, column: usize) -> Result<(), ParseError> {
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(ParseError::new(line, column, "unterminated string literal"))
                }
                Some('\\') => {
                    self.bump();
                }
                Some('"') => return Ok(()),
                Some(_) => {}
            }
        }
    }

    fn scan_heredoc(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        let indented = self.peek() == Some('-');
        if indented {
            self.bump();
        }

        let marker_start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        let marker = &self.src[marker_start..self.pos];
        if marker.is_empty() {
            return Err(ParseError::new(line, column, "heredoc marker expected after '<<'"));
        }
        if self.peek() == Some('\r') {
            self.bump();
        }
        if self.bump() != Some('\n') {
            return Err(ParseError::new(
                line,
                column,
                "heredoc marker must be followed by a newline",
            ));
        }

        loop {
            let line_start = self.pos;
            while matches!(self.peek(), Some(c) if c != '\n') {
                self.bump();
            }
            let content = self.src[line_start..self.pos].trim_end_matches('\r');
            let content = if indented { content.trim_start() } else { content };
            if content == marker {
                return Ok(TokenKind::Heredoc);
            }
            if self.bump().is_none() {
                return Err(ParseError::new(
                    line,
                    column,
                    format!("heredoc {marker:?} is not terminated"),
                ));
            }
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        if self.peek() == Some('-') {
            self.bump();
            if !matches!(self.peek(), Some('0'..='9' | '.')) {
                return Err(ParseError::new(line, column, "expected digit after '-'"));
            }
        }
        let mut prev = '0';
        while let Some(c) = self.peek() {
            let exponent_sign = (c == '+' || c == '-') && matches!(prev, 'e' | 'E');
            if !(c.is_ascii_alphanumeric() || c == '.' || exponent_sign) {
                break;
            }
            prev = c;
            self.bump();
        }
        Ok(TokenKind::Number)
    }

    fn scan_ident(&mut self) -> TokenKind {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || matches!(c, '_' | '-' | '.')) {
            self.bump();
        }
        match &self.src[start..self.pos] {
            "true" | "false" => TokenKind::Bool,
            _ => TokenKind::Ident,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn simple_assignment() {
        assert_eq!(
            kinds(r#"a = "b""#),
            vec![TokenKind::Ident, TokenKind::Assign, TokenKind::String, TokenKind::Eof]
        );
    }

    #[test]
    fn trivia_is_attached_to_next_token() {
        let tokens = tokenize("# note\n  port = 80 // trailing\n").unwrap();
        assert_eq!(tokens[0].leading, "# note\n  ");
        assert_eq!(tokens[0].text, "port");
        assert_eq!(tokens[2].kind, TokenKind::Number);
        assert_eq!(tokens[3].kind, TokenKind::Eof);
        assert_eq!(tokens[3].leading, " // trailing\n");
    }

    #[test]
    fn booleans_numbers_and_negative_floats() {
        assert_eq!(
            kinds("a = true\nb = -1.5e+3\nc = 0x1F"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Bool,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Number,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn interpolation_may_contain_quotes() {
        let tokens = tokenize(r#"a = "${lookup(m, "k")}-x""#).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, r#""${lookup(m, "k")}-x""#);
    }

    #[test]
    fn interpolation_counts_nested_braces() {
        let tokens = tokenize(r#"a = "${ {} "q" }" b = 1"#).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::String);
        assert_eq!(tokens[2].text, r#""${ {} "q" }""#);
        assert_eq!(tokens[3].text, "b");
    }

    #[test]
    fn heredoc_spans_lines() {
        let src = "doc = <<EOF\nline one\n  line two\nEOF\nnext = 1\n";
        let tokens = tokenize(src).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Heredoc);
        assert_eq!(tokens[2].text, "<<EOF\nline one\n  line two\nEOF");
        assert_eq!(tokens[3].text, "next");
    }

    #[test]
    fn indented_heredoc_marker() {
        let src = "doc = <<-EOT\n    body\n    EOT\n";
        let tokens = tokenize(src).unwrap();
        assert_eq!(tokens[2].kind, TokenKind::Heredoc);
    }

    #[test]
    fn unterminated_string_reports_position() {
        let err = tokenize("a = 1\nb = \"oops\n").unwrap_err();
        assert_eq!((err.line, err.column), (2, 5));
    }

    #[test]
    fn unterminated_block_comment() {
        assert!(tokenize("/* never closed").is_err());
    }

    #[test]
    fn unexpected_character() {
        let err = tokenize("a = @").unwrap_err();
        assert!(err.message.contains('@'));
    }
}
