use logos::Logos;
use std::fmt;
use std::ops::Range;

/// Token types for flow notation
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token<'src> {
    #[token("\n")]
    Newline,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice())]
    String(&'src str),

    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    #[token("->")]
    Arrow,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token(",")]
    Comma,

    #[token("@")]
    At,
}

impl<'src> Token<'src> {
    /// Tokens that end a statement without being part of it.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Token::Newline | Token::Semicolon)
    }
}

impl<'src> fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Newline => write!(f, "newline"),
            Token::Ident(s) => write!(f, "identifier '{}'", s),
            Token::String(s) => write!(f, "string {}", s),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Arrow => write!(f, "->"),
            Token::LBrace => write!(f, "{{"),
            Token::RBrace => write!(f, "}}"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Colon => write!(f, ":"),
            Token::Semicolon => write!(f, ";"),
            Token::Comma => write!(f, ","),
            Token::At => write!(f, "@"),
        }
    }
}

pub type Spanned<'src> = (Token<'src>, Range<usize>);

/// Tokenize a source string, dropping anything the lexer rejects
pub fn tokenize(source: &str) -> Vec<Spanned<'_>> {
    tokenize_with_errors(source).0
}

/// Tokenize a source string, returning the ranges the lexer rejected alongside
/// the tokens.
pub fn tokenize_with_errors(source: &str) -> (Vec<Spanned<'_>>, Vec<Range<usize>>) {
    let mut tokens = Vec::new();
    let mut errors: Vec<Range<usize>> = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            // Merge runs of rejected characters into one range
            Err(()) => match errors.last_mut() {
                Some(last) if last.end == span.start => last.end = span.end,
                _ => errors.push(span),
            },
        }
    }
    (tokens, errors)
}
