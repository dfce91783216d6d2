// Doodle Language Lexer
// Tokenizes Doodle source code into a stream of tokens

use crate::compiler::error::CompilerError;

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntegerLiteral(i64),
    FloatLiteral(f64),
    CharLiteral(char),
    StringLiteral(String),
    Identifier(String),

    // Keywords
    Program,
    Var,
    Func,
    If,
    Else,
    While,
    For,
    Write,
    Return,
    True,
    False,
    TypeName(String), // int, float, ..., background

    // Symbols
    LeftBrace,    // {
    RightBrace,   // }
    LeftBracket,  // [
    RightBracket, // ]
    LeftParen,    // (
    RightParen,   // )
    Semicolon,    // ;
    Comma,        // ,
    Dot,          // .

    // Operators
    Equal,      // =
    EqualEqual, // ==
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Less,       // <
    Greater,    // >
    And,        // &&
    Or,         // ||
    Not,        // !

    EOF,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Lexer {
            input: chars,
            position: 0,
            line: 1,
            column: 1,
            current_char,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Token>, CompilerError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EOF;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, CompilerError> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;

        let kind = match self.current_char {
            None => TokenKind::EOF,
            Some(ch) => match ch {
                '{' => self.single(TokenKind::LeftBrace),
                '}' => self.single(TokenKind::RightBrace),
                '[' => self.single(TokenKind::LeftBracket),
                ']' => self.single(TokenKind::RightBracket),
                '(' => self.single(TokenKind::LeftParen),
                ')' => self.single(TokenKind::RightParen),
                ';' => self.single(TokenKind::Semicolon),
                ',' => self.single(TokenKind::Comma),
                '.' => self.single(TokenKind::Dot),
                '+' => self.single(TokenKind::Plus),
                '-' => self.single(TokenKind::Minus),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '<' => self.single(TokenKind::Less),
                '>' => self.single(TokenKind::Greater),
                '!' => self.single(TokenKind::Not),
                '=' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        TokenKind::EqualEqual
                    } else {
                        TokenKind::Equal
                    }
                }
                '&' => self.double('&', TokenKind::And, line)?,
                '|' => self.double('|', TokenKind::Or, line)?,
                '"' => {
                    self.advance();
                    TokenKind::StringLiteral(self.read_string(line)?)
                }
                '\'' => {
                    self.advance();
                    TokenKind::CharLiteral(self.read_char(line)?)
                }
                ch if ch.is_ascii_digit() => self.read_number(line)?,
                ch if ch.is_alphabetic() || ch == '_' => {
                    let identifier = self.read_identifier();
                    keyword_or_identifier(identifier)
                }
                ch => {
                    return Err(CompilerError::ParseError(
                        format!("Unexpected character '{}'", ch),
                        line,
                    ));
                }
            },
        };

        Ok(Token { kind, line, column })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn double(
        &mut self,
        expected: char,
        kind: TokenKind,
        line: usize,
    ) -> Result<TokenKind, CompilerError> {
        self.advance();
        if self.current_char == Some(expected) {
            self.advance();
            Ok(kind)
        } else {
            Err(CompilerError::ParseError(
                format!("Expected '{}{}'", expected, expected),
                line,
            ))
        }
    }

    fn advance(&mut self) {
        if let Some('\n') = self.current_char {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else if ch == '/' && self.peek_next() == Some('/') {
                while let Some(c) = self.current_char {
                    if c == '\n' {
                        break;
                    }
                    self.advance();
                }
            } else {
                break;
            }
        }
    }

    fn read_escape(&mut self, line: usize) -> Result<char, CompilerError> {
        self.advance();
        let ch = match self.current_char {
            Some('n') => '\n',
            Some('t') => '\t',
            Some(other) => other,
            None => {
                return Err(CompilerError::ParseError(
                    "Unterminated escape sequence".to_string(),
                    line,
                ))
            }
        };
        self.advance();
        Ok(ch)
    }

    fn read_string(&mut self, line: usize) -> Result<String, CompilerError> {
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(value);
                }
                '\\' => value.push(self.read_escape(line)?),
                '\n' => break,
                ch => {
                    value.push(ch);
                    self.advance();
                }
            }
        }

        Err(CompilerError::ParseError(
            "Unterminated string literal".to_string(),
            line,
        ))
    }

    fn read_char(&mut self, line: usize) -> Result<char, CompilerError> {
        let value = match self.current_char {
            Some('\\') => self.read_escape(line)?,
            Some(ch) if ch != '\'' && ch != '\n' => {
                self.advance();
                ch
            }
            _ => {
                return Err(CompilerError::ParseError(
                    "Empty character literal".to_string(),
                    line,
                ))
            }
        };

        if self.current_char != Some('\'') {
            return Err(CompilerError::ParseError(
                "Unterminated character literal".to_string(),
                line,
            ));
        }
        self.advance();
        Ok(value)
    }

    fn read_number(&mut self, line: usize) -> Result<TokenKind, CompilerError> {
        let mut value = String::new();
        let mut is_float = false;

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                value.push(ch);
                self.advance();
            } else if ch == '.' && !is_float && self.peek_next().is_some_and(|c| c.is_ascii_digit())
            {
                is_float = true;
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if is_float {
            value
                .parse::<f64>()
                .map(TokenKind::FloatLiteral)
                .map_err(|_| CompilerError::ParseError(format!("Invalid number '{}'", value), line))
        } else {
            value
                .parse::<i64>()
                .map(TokenKind::IntegerLiteral)
                .map_err(|_| CompilerError::ParseError(format!("Invalid number '{}'", value), line))
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut value = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        value
    }
}

fn keyword_or_identifier(identifier: String) -> TokenKind {
    match identifier.as_str() {
        "program" => TokenKind::Program,
        "var" => TokenKind::Var,
        "func" => TokenKind::Func,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "while" => TokenKind::While,
        "for" => TokenKind::For,
        "write" => TokenKind::Write,
        "return" => TokenKind::Return,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "int" | "float" | "char" | "bool" | "string" | "void" | "square" | "circle" | "image"
        | "text" | "background" => TokenKind::TypeName(identifier),
        _ => TokenKind::Identifier(identifier),
    }
}

/// Render a string as a double-quoted literal on a single line
pub fn quote_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            ch => out.push(ch),
        }
    }
    out.push('"');
    out
}

pub fn quote_char(value: char) -> String {
    match value {
        '\'' => "'\\''".to_string(),
        '\\' => "'\\\\'".to_string(),
        '\n' => "'\\n'".to_string(),
        '\t' => "'\\t'".to_string(),
        ch => format!("'{}'", ch),
    }
}

/// Inverse of `quote_string` / `quote_char`: strip the delimiters and
/// resolve escapes. Returns `None` if `text` is not delimited by `quote`.
pub fn unquote(text: &str, quote: char) -> Option<String> {
    let inner = text.strip_prefix(quote)?.strip_suffix(quote)?;
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next()? {
                'n' => out.push('\n'),
                't' => out.push('\t'),
                other => out.push(other),
            }
        } else {
            out.push(ch);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_numbers_and_operators() {
        assert_eq!(
            kinds("x = 2.5 + 3; // trailing"),
            vec![
                TokenKind::Identifier("x".to_string()),
                TokenKind::Equal,
                TokenKind::FloatLiteral(2.5),
                TokenKind::Plus,
                TokenKind::IntegerLiteral(3),
                TokenKind::Semicolon,
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_keywords_and_types() {
        assert_eq!(
            kinds("func square f"),
            vec![
                TokenKind::Func,
                TokenKind::TypeName("square".to_string()),
                TokenKind::Identifier("f".to_string()),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_string_and_char_literals() {
        assert_eq!(
            kinds(r#""a \"b\"" 'c' '\n'"#),
            vec![
                TokenKind::StringLiteral("a \"b\"".to_string()),
                TokenKind::CharLiteral('c'),
                TokenKind::CharLiteral('\n'),
                TokenKind::EOF,
            ]
        );
    }

    #[test]
    fn test_line_tracking() {
        let tokens = Lexer::new("a\n\nb").tokenize().unwrap();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_quote_roundtrip_with_spaces() {
        let quoted = quote_string("hello \"big\" world");
        assert_eq!(unquote(&quoted, '"').as_deref(), Some("hello \"big\" world"));
        assert_eq!(unquote(&quote_char('\''), '\'').as_deref(), Some("'"));
    }

    #[test]
    fn test_unterminated_string() {
        assert!(matches!(
            Lexer::new("\"abc").tokenize(),
            Err(CompilerError::ParseError(_, 1))
        ));
    }

    #[test]
    fn test_single_ampersand_rejected() {
        assert!(Lexer::new("a & b").tokenize().is_err());
    }
}
