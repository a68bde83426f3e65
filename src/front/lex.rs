//! The lexer.
//!
//! C-minus's token set is small and regular enough that direct `char`
//! matching is both simpler and faster than compiling a `Regex` per token
//! class (the approach the teacher crate sketches for its own toy
//! language). The `Token`/`TokenKind`/`LexError`/`Display` shape is kept.

use derive_more::Display;

/// Tokens in the program.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display)]
#[display("kind: '{kind}', part of input: '{text}', line: {line}")]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub text: &'src str,
    pub line: u32,
}

/// Token classes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Display, Debug)]
pub enum TokenKind {
    #[display("id")]
    Id,
    #[display("num")]
    Num,

    #[display("int")]
    Int,
    #[display("void")]
    Void,
    #[display("if")]
    If,
    #[display("else")]
    Else,
    #[display("while")]
    While,
    #[display("return")]
    Return,
    #[display("read")]
    Read,
    #[display("write")]
    Write,

    #[display("+")]
    Plus,
    #[display("-")]
    Minus,
    #[display("*")]
    Times,
    #[display("/")]
    Over,
    #[display("%")]
    Mod,

    #[display("==")]
    Eq,
    #[display("!=")]
    Ne,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("=")]
    Assign,

    #[display(";")]
    Semi,
    #[display(",")]
    Comma,
    #[display("(")]
    LParen,
    #[display(")")]
    RParen,
    #[display("[")]
    LBracket,
    #[display("]")]
    RBracket,
    #[display("{{")]
    LBrace,
    #[display("}}")]
    RBrace,

    #[display("eof")]
    Eof,
}

impl TokenKind {
    fn keyword(word: &str) -> Option<TokenKind> {
        use TokenKind::*;
        Some(match word {
            "int" => Int,
            "void" => Void,
            "if" => If,
            "else" => Else,
            "while" => While,
            "return" => Return,
            "read" => Read,
            "write" => Write,
            _ => return None,
        })
    }
}

#[derive(Clone, Copy)]
pub struct LexError {
    pub line: u32,
    pub ch: char,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lexer error: unexpected character {:?} at line {}", self.ch, self.line)
    }
}

impl std::fmt::Debug for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

pub struct Lexer<'input> {
    input: &'input str,
    bytes: &'input [u8],
    pos: usize,
    line: u32,
}

impl<'input> Lexer<'input> {
    pub fn new(input: &'input str) -> Self {
        Lexer { input, bytes: input.as_bytes(), pos: 0, line: 1 }
    }

    pub fn end_of_input(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
        }
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b) if b.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.bump();
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.bump();
                    self.bump();
                    while !(self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/')) {
                        if self.bump().is_none() {
                            break;
                        }
                    }
                    self.bump();
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// Get the next token if possible.
    ///
    /// The return type distinguishes between end-of-input and lexer error.
    pub fn next(&mut self) -> Result<Option<Token<'input>>, LexError> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        let line = self.line;
        let Some(b) = self.peek() else { return Ok(None) };

        let kind = if b.is_ascii_alphabetic() || b == b'_' {
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                self.bump();
            }
            let word = &self.input[start..self.pos];
            TokenKind::keyword(word).unwrap_or(TokenKind::Id)
        } else if b.is_ascii_digit() {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.bump();
            }
            TokenKind::Num
        } else {
            self.bump();
            use TokenKind::*;
            match b {
                b'+' => Plus,
                b'-' => Minus,
                b'*' => Times,
                b'/' => Over,
                b'%' => Mod,
                b'=' if self.peek() == Some(b'=') => {
                    self.bump();
                    Eq
                }
                b'=' => Assign,
                b'!' if self.peek() == Some(b'=') => {
                    self.bump();
                    Ne
                }
                b'<' if self.peek() == Some(b'=') => {
                    self.bump();
                    Le
                }
                b'<' => Lt,
                b'>' if self.peek() == Some(b'=') => {
                    self.bump();
                    Ge
                }
                b'>' => Gt,
                b';' => Semi,
                b',' => Comma,
                b'(' => LParen,
                b')' => RParen,
                b'[' => LBracket,
                b']' => RBracket,
                b'{' => LBrace,
                b'}' => RBrace,
                other => return Err(LexError { line, ch: other as char }),
            }
        };

        Ok(Some(Token { kind, text: &self.input[start..self.pos], line }))
    }

    /// Collects every token up front; used by `--ts` tracing and the parser.
    pub fn tokenize(mut self) -> Result<Vec<Token<'input>>, LexError> {
        let mut out = Vec::new();
        while let Some(tok) = self.next()? {
            out.push(tok);
        }
        out.push(Token { kind: TokenKind::Eof, text: "", line: self.line });
        Ok(out)
    }
}
