//! Template lexer.

use crate::error::EvaluationError;

#[derive(Debug, Clone, PartialEq)]
pub enum LexKind {
    Number(f64),
    Str(String),
    Ident(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Mod,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    AndAnd,
    OrOr,
    Question,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Eof,
}

impl LexKind {
    pub fn describe(&self) -> String {
        match self {
            LexKind::Number(n) => format!("number {}", n),
            LexKind::Str(_) => "string".to_string(),
            LexKind::Ident(name) => format!("identifier '{}'", name),
            LexKind::Eof => "end of input".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            LexKind::True => "true",
            LexKind::False => "false",
            LexKind::Null => "null",
            LexKind::And => "and",
            LexKind::Or => "or",
            LexKind::Not => "not",
            LexKind::Mod => "mod",
            LexKind::Plus => "+",
            LexKind::Minus => "-",
            LexKind::Star => "*",
            LexKind::Slash => "/",
            LexKind::Percent => "%",
            LexKind::Caret => "^",
            LexKind::Bang => "!",
            LexKind::EqEq => "==",
            LexKind::NotEq => "!=",
            LexKind::Lt => "<",
            LexKind::LtEq => "<=",
            LexKind::Gt => ">",
            LexKind::GtEq => ">=",
            LexKind::AndAnd => "&&",
            LexKind::OrOr => "||",
            LexKind::Question => "?",
            LexKind::Colon => ":",
            LexKind::Comma => ",",
            LexKind::Dot => ".",
            LexKind::LParen => "(",
            LexKind::RParen => ")",
            LexKind::LBracket => "[",
            LexKind::RBracket => "]",
            LexKind::LBrace => "{",
            LexKind::RBrace => "}",
            LexKind::Number(_) | LexKind::Str(_) | LexKind::Ident(_) | LexKind::Eof => "",
        }
    }
}

/// A lexeme and the byte offset it starts at.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub kind: LexKind,
    pub offset: usize,
}

/// Split a template source into lexemes. The result always ends with `Eof`.
pub fn tokenize(src: &str) -> Result<Vec<Lexeme>, EvaluationError> {
    let mut out = Vec::new();
    let mut chars = src.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }

        let kind = if c.is_ascii_digit() {
            let end = scan_number_end(src, offset);
            let text = &src[offset..end];
            let n: f64 = text
                .parse()
                .map_err(|_| EvaluationError::syntax(offset, format!("invalid number '{}'", text)))?;
            while chars.peek().is_some_and(|&(i, _)| i < end) {
                chars.next();
            }
            LexKind::Number(n)
        } else if c == '\'' || c == '"' {
            chars.next();
            LexKind::Str(scan_string(&mut chars, c, offset)?)
        } else if is_ident_start(c) {
            let mut end = offset;
            while let Some(&(i, ch)) = chars.peek() {
                if !is_ident_continue(ch) {
                    break;
                }
                end = i + ch.len_utf8();
                chars.next();
            }
            keyword_or_ident(&src[offset..end])
        } else {
            chars.next();
            let next = chars.peek().map(|&(_, ch)| ch);
            let (kind, wide) = match (c, next) {
                ('=', Some('=')) => (LexKind::EqEq, true),
                ('!', Some('=')) => (LexKind::NotEq, true),
                ('<', Some('=')) => (LexKind::LtEq, true),
                ('>', Some('=')) => (LexKind::GtEq, true),
                ('&', Some('&')) => (LexKind::AndAnd, true),
                ('|', Some('|')) => (LexKind::OrOr, true),
                ('=', _) => {
                    return Err(EvaluationError::syntax(
                        offset,
                        "assignment is not supported",
                    ))
                }
                ('!', _) => (LexKind::Bang, false),
                ('<', _) => (LexKind::Lt, false),
                ('>', _) => (LexKind::Gt, false),
                ('+', _) => (LexKind::Plus, false),
                ('-', _) => (LexKind::Minus, false),
                ('*', _) => (LexKind::Star, false),
                ('/', _) => (LexKind::Slash, false),
                ('%', _) => (LexKind::Percent, false),
                ('^', _) => (LexKind::Caret, false),
                ('?', _) => (LexKind::Question, false),
                (':', _) => (LexKind::Colon, false),
                (',', _) => (LexKind::Comma, false),
                ('.', _) => (LexKind::Dot, false),
                ('(', _) => (LexKind::LParen, false),
                (')', _) => (LexKind::RParen, false),
                ('[', _) => (LexKind::LBracket, false),
                (']', _) => (LexKind::RBracket, false),
                ('{', _) => (LexKind::LBrace, false),
                ('}', _) => (LexKind::RBrace, false),
                _ => {
                    return Err(EvaluationError::syntax(
                        offset,
                        format!("unexpected character '{}'", c),
                    ))
                }
            };
            if wide {
                chars.next();
            }
            kind
        };

        out.push(Lexeme { kind, offset });
    }

    out.push(Lexeme {
        kind: LexKind::Eof,
        offset: src.len(),
    });
    Ok(out)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

fn keyword_or_ident(word: &str) -> LexKind {
    match word {
        "true" => LexKind::True,
        "false" => LexKind::False,
        "null" => LexKind::Null,
        "and" => LexKind::And,
        "or" => LexKind::Or,
        "not" => LexKind::Not,
        "mod" => LexKind::Mod,
        _ => LexKind::Ident(word.to_string()),
    }
}

/// Byte offset one past the number literal starting at `start`.
fn scan_number_end(src: &str, start: usize) -> usize {
    let bytes = src.as_bytes();
    let digits = |mut i: usize| {
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i
    };

    let mut end = digits(start);
    if end + 1 < bytes.len() && bytes[end] == b'.' && bytes[end + 1].is_ascii_digit() {
        end = digits(end + 1);
    }
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            end = digits(exp);
        }
    }
    end
}

fn scan_string(
    chars: &mut std::iter::Peekable<std::str::CharIndices<'_>>,
    quote: char,
    start: usize,
) -> Result<String, EvaluationError> {
    let mut out = String::new();
    while let Some((offset, c)) = chars.next() {
        match c {
            c if c == quote => return Ok(out),
            '\\' => {
                let Some((_, escaped)) = chars.next() else {
                    break;
                };
                match escaped {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    '\\' | '\'' | '"' => out.push(escaped),
                    other => {
                        return Err(EvaluationError::syntax(
                            offset,
                            format!("unknown escape '\\{}'", other),
                        ))
                    }
                }
            }
            c => out.push(c),
        }
    }
    Err(EvaluationError::syntax(start, "unterminated string"))
}
