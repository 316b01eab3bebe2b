//! Line-oriented text protocol
//!
//! Newlines are rewritten to `;` so each output line becomes one record, then
//! the buffer is tokenised with the host's text-message rules.

use log::{error, trace};

use crate::message::{Atom, Message};

/// Lexical unit of the text protocol
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Atom(Atom),
    /// `;` record terminator
    Semi,
    /// `,` record terminator
    Comma,
    /// `$N` on its own
    Dollar(u32),
    /// a word with an embedded `$N`, e.g. `foo$1`
    DollarSymbol(String),
}

impl Token {
    fn is_substitution(&self) -> bool {
        matches!(self, Token::Dollar(_) | Token::DollarSymbol(_))
    }
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\n' | b'\r' | b'\t')
}

fn is_separator(c: u8) -> bool {
    c == b';' || c == b','
}

/// Split a byte buffer into tokens
pub fn tokenize(bytes: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        if is_space(c) {
            i += 1;
            continue;
        }
        if c == b';' {
            tokens.push(Token::Semi);
            i += 1;
            continue;
        }
        if c == b',' {
            tokens.push(Token::Comma);
            i += 1;
            continue;
        }

        let mut word = Vec::new();
        let mut escaped = false;
        let mut substitution = false;
        while i < bytes.len() {
            let c = bytes[i];
            if c == b'\\' && i + 1 < bytes.len() {
                word.push(bytes[i + 1]);
                escaped = true;
                i += 2;
                continue;
            }
            if is_space(c) || is_separator(c) {
                break;
            }
            if c == b'$' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
                substitution = true;
            }
            word.push(c);
            i += 1;
        }
        tokens.push(classify(&word, escaped, substitution));
    }

    tokens
}

fn classify(word: &[u8], escaped: bool, substitution: bool) -> Token {
    let text = String::from_utf8_lossy(word).into_owned();
    if substitution {
        return match text.strip_prefix('$') {
            Some(index) if index.bytes().all(|b| b.is_ascii_digit()) => {
                Token::Dollar(index.parse().unwrap_or(u32::MAX))
            }
            _ => Token::DollarSymbol(text),
        };
    }
    if escaped {
        Token::Atom(Atom::Symbol(text))
    } else {
        Token::Atom(Atom::parse(&text))
    }
}

/// Convert one read buffer into messages.
///
/// The buffer ends at its first NUL byte. Records are emitted in order; a record
/// holding a substitution marker is dropped whole, and a trailing fragment
/// without a terminator is discarded.
pub fn parse_records(bytes: &[u8]) -> Vec<Message> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let rewritten: Vec<u8> = bytes[..end]
        .iter()
        .map(|&b| if b == b'\n' { b';' } else { b })
        .collect();

    let mut messages = Vec::new();
    let mut record: Vec<Token> = Vec::new();

    for token in tokenize(&rewritten) {
        match token {
            Token::Semi | Token::Comma => {
                if let Some(message) = finish_record(std::mem::take(&mut record)) {
                    messages.push(message);
                }
            }
            other => record.push(other),
        }
    }

    if !record.is_empty() {
        trace!("discarding unterminated fragment of {} tokens", record.len());
    }

    messages
}

fn finish_record(record: Vec<Token>) -> Option<Message> {
    if record.is_empty() {
        return None;
    }
    if record.iter().any(Token::is_substitution) {
        error!("got dollar sign in message, record dropped");
        return None;
    }

    let atoms = record
        .into_iter()
        .filter_map(|token| match token {
            Token::Atom(atom) => Some(atom),
            _ => None,
        })
        .collect();
    Message::from_atoms(atoms)
}
