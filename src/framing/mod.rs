//! Framing layer: raw pipe bytes to discrete messages
//!
//! Two wire formats, chosen when a process starts and fixed for its lifetime:
//!
//! - **Text**: newline-terminated records tokenised into numbers and symbols
//! - **Binary**: every byte of a read becomes one element of a list
//!
//! # Examples
//!
//! ```
//! use proc_command::framing::OutputMode;
//! use proc_command::Message;
//!
//! let messages = OutputMode::Text.frame(b"42\n");
//! assert_eq!(messages, vec![Message::Float(42.0)]);
//! ```

pub mod text;

use serde::{Deserialize, Serialize};

use crate::message::{Atom, Message};

/// Wire format of the child's output streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Text,
    Binary,
}

impl OutputMode {
    /// Convert the bytes of a single read into messages
    pub fn frame(self, bytes: &[u8]) -> Vec<Message> {
        match self {
            OutputMode::Text => text::parse_records(bytes),
            OutputMode::Binary => frame_binary(bytes).into_iter().collect(),
        }
    }
}

fn frame_binary(bytes: &[u8]) -> Option<Message> {
    if bytes.is_empty() {
        return None;
    }
    Some(Message::List(
        bytes.iter().map(|&b| Atom::Float(f64::from(b))).collect(),
    ))
}
