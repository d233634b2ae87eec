use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;

use crate::error::ScanError;

type ScanResult<T> = Result<T, ScanError>;

static KEYWORDS: Lazy<FxHashMap<&'static str, TokenType>> = Lazy::new(|| {
    [
        ("and", TokenType::And),
        ("class", TokenType::Class),
        ("else", TokenType::Else),
        ("false", TokenType::False),
        ("for", TokenType::For),
        ("fun", TokenType::Fun),
        ("if", TokenType::If),
        ("nil", TokenType::Nil),
        ("or", TokenType::Or),
        ("print", TokenType::Print),
        ("return", TokenType::Return),
        ("super", TokenType::Super),
        ("this", TokenType::This),
        ("true", TokenType::True),
        ("var", TokenType::Var),
        ("while", TokenType::While),
    ]
    .into_iter()
    .collect()
});

pub fn scan_tokens(code: &str) -> ScanResult<Vec<Token>> {
    let mut tokens: Vec<Token> = vec![];
    let mut scanner = Scanner::new(code);

    loop {
        let token = scanner.next_token()?;
        let eof = token.token_type == TokenType::EOF;
        tokens.push(token);
        if eof {
            break;
        }
    }

    tracing::debug!(count = tokens.len(), "scanned tokens");
    Ok(tokens)
}

#[derive(Debug)]
pub struct Scanner {
    chars: Vec<char>,
    cursor_begin: usize,
    cursor_end: usize,
    line: u32,
}

impl Scanner {
    pub fn new(code: &str) -> Scanner {
        Scanner {
            chars: code.chars().collect(),
            cursor_begin: 0,
            cursor_end: 0,
            line: 1,
        }
    }

    pub fn next_token(&mut self) -> ScanResult<Token> {
        self.skip_whitespace_and_comments();
        self.cursor_begin = self.cursor_end;

        let Some(current) = self.advance() else {
            return Ok(self.make_token(TokenType::EOF));
        };

        let token_type = match current {
            '(' => TokenType::LeftParen,
            ')' => TokenType::RightParen,
            '{' => TokenType::LeftBrace,
            '}' => TokenType::RightBrace,
            ',' => TokenType::Comma,
            '.' => TokenType::Dot,
            '-' => TokenType::Minus,
            '+' => TokenType::Plus,
            ';' => TokenType::Semicolon,
            '/' => TokenType::Slash,
            '*' => TokenType::Star,
            '!' => self.pick_on_equal(TokenType::BangEqual, TokenType::Bang),
            '=' => self.pick_on_equal(TokenType::EqualEqual, TokenType::Equal),
            '<' => self.pick_on_equal(TokenType::LessEqual, TokenType::Less),
            '>' => self.pick_on_equal(TokenType::GreaterEqual, TokenType::Greater),
            '"' => self.string()?,
            c if c.is_ascii_digit() => self.number(),
            c if is_identifier_start(c) => self.identifier(),
            c => {
                return Err(ScanError {
                    line: self.line,
                    message: format!("Unexpected character '{c}'."),
                })
            }
        };

        Ok(self.make_token(token_type))
    }

    fn skip_whitespace_and_comments(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\r' | '\t' => {
                    self.cursor_end += 1;
                }
                '\n' => {
                    self.line += 1;
                    self.cursor_end += 1;
                }
                '/' if self.peek_next() == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.cursor_end += 1;
                    }
                }
                _ => return,
            }
        }
    }

    fn string(&mut self) -> ScanResult<TokenType> {
        let start_line = self.line;
        loop {
            match self.advance() {
                Some('"') => break,
                Some('\n') => self.line += 1,
                Some(_) => {}
                None => {
                    return Err(ScanError {
                        line: start_line,
                        message: "Unterminated string.".to_string(),
                    })
                }
            }
        }

        // trim the surrounding quotes
        let value: String = self.chars[self.cursor_begin + 1..self.cursor_end - 1].iter().collect();
        Ok(TokenType::String(value))
    }

    fn number(&mut self) -> TokenType {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.cursor_end += 1;
        }

        // a trailing '.' is not part of the number
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.cursor_end += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.cursor_end += 1;
            }
        }

        // only ascii digits and a single '.' were consumed, so parsing cannot fail
        let value = self.lexeme().parse::<f64>().unwrap_or_default();
        TokenType::Number(value)
    }

    fn identifier(&mut self) -> TokenType {
        while self.peek().is_some_and(is_identifier_char) {
            self.cursor_end += 1;
        }

        let text = self.lexeme();
        match KEYWORDS.get(text.as_str()) {
            Some(keyword) => keyword.clone(),
            None => TokenType::Identifier(text),
        }
    }

    fn pick_on_equal(&mut self, matched: TokenType, otherwise: TokenType) -> TokenType {
        if self.peek() == Some('=') {
            self.cursor_end += 1;
            matched
        } else {
            otherwise
        }
    }

    fn advance(&mut self) -> Option<char> {
        let current = self.peek()?;
        self.cursor_end += 1;
        Some(current)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.cursor_end).copied()
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.cursor_end + 1).copied()
    }

    fn lexeme(&self) -> String {
        self.chars[self.cursor_begin..self.cursor_end].iter().collect()
    }

    fn make_token(&self, token_type: TokenType) -> Token {
        Token {
            token_type,
            lexeme: self.lexeme(),
            line: self.line,
        }
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Minus,
    Plus,
    Semicolon,
    Slash,
    Star,

    // One or two character tokens.
    Bang,
    BangEqual,
    Equal,
    EqualEqual,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,

    // Literals.
    Identifier(String),
    String(String),
    Number(f64),

    // Keywords.
    And,
    Class,
    Else,
    False,
    Fun,
    For,
    If,
    Nil,
    Or,
    Print,
    Return,
    Super,
    This,
    True,
    Var,
    While,

    EOF,
}
