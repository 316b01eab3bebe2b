//! Discrete messages exchanged with the host
//!
//! An [`Atom`] is a single typed field (number or symbol). A [`Message`] is what
//! reaches an outlet: a bare number, a list, or a tagged message made of a
//! selector followed by fields.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Significant digits used when rendering numbers (`%g` semantics)
const PRECISION: i32 = 6;

/// A single typed field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Atom {
    Float(f64),
    Symbol(String),
}

impl Atom {
    /// Create a symbol atom
    pub fn symbol(s: impl Into<String>) -> Self {
        Atom::Symbol(s.into())
    }

    /// Classify a bare token: numeric literals become floats, everything else a symbol
    pub fn parse(token: &str) -> Self {
        if is_float_literal(token) {
            if let Ok(value) = token.parse::<f64>() {
                return Atom::Float(value);
            }
        }
        Atom::Symbol(token.to_string())
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Atom::Float(v) => Some(*v),
            Atom::Symbol(_) => None,
        }
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Atom::Symbol(s) => Some(s),
            Atom::Float(_) => None,
        }
    }

    /// Text form used for argv entries and stdin lines
    pub fn to_text(&self) -> String {
        match self {
            Atom::Float(v) => format_float(*v),
            Atom::Symbol(s) => s.clone(),
        }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Atom::Float(v) => f.write_str(&format_float(*v)),
            Atom::Symbol(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Atom {
    fn from(value: f64) -> Self {
        Atom::Float(value)
    }
}

impl From<&str> for Atom {
    fn from(value: &str) -> Self {
        Atom::Symbol(value.to_string())
    }
}

/// A message delivered to an outlet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Message {
    /// A single number
    Float(f64),
    /// Several fields starting with a number, or raw bytes in binary mode
    List(Vec<Atom>),
    /// A selector followed by fields
    Anything { selector: String, args: Vec<Atom> },
}

impl Message {
    /// Build the message for one record of atoms, following the outlet rules:
    /// one number -> float, leading number -> list, leading symbol -> tagged.
    pub fn from_atoms(mut atoms: Vec<Atom>) -> Option<Self> {
        let leading = atoms.first()?.as_float();
        if let Some(value) = leading {
            if atoms.len() == 1 {
                return Some(Message::Float(value));
            }
            return Some(Message::List(atoms));
        }

        let args = atoms.split_off(1);
        match atoms.pop() {
            Some(Atom::Symbol(selector)) => Some(Message::Anything { selector, args }),
            _ => None,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Float(v) => f.write_str(&format_float(*v)),
            Message::List(atoms) => f.write_str(&render_fields(atoms)),
            Message::Anything { selector, args } => {
                f.write_str(selector)?;
                if !args.is_empty() {
                    write!(f, " {}", render_fields(args))?;
                }
                Ok(())
            }
        }
    }
}

/// Join fields with single spaces
pub fn render_fields(atoms: &[Atom]) -> String {
    atoms
        .iter()
        .map(Atom::to_text)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Render a number the way C's `%g` does: six significant digits, trailing
/// zeros stripped, exponent form outside `1e-4 <= |x| < 1e6`.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs())
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// `[+-]?(digits[.digits]|.digits)([eE][+-]?digits)?`
pub fn is_float_literal(token: &str) -> bool {
    let bytes = token.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
        i += 1;
    }
    let mut mantissa_digits = digits(&mut i);
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        mantissa_digits += digits(&mut i);
    }
    if mantissa_digits == 0 {
        return false;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}
