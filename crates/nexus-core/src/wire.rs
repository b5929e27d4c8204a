//! Nexus wire format: the text control protocol spoken over node connections.
//!
//! Every message is a `-`-separated record whose first field is the command:
//!
//! | Message      | Form                                    | Direction      |
//! |--------------|-----------------------------------------|----------------|
//! | Register     | `nn-<host>-<ip>-<caps>-<interests>`     | node → broker  |
//! | Depart       | `cld-<host>`                            | node → broker  |
//! | Introduction | `ct-<host>-<ip>-<caps>-<interests>*`    | broker → node  |
//! | Operator     | `shutdown` / `reboot`                   | broker → node  |
//!
//! Topic lists are `:`-joined; an empty field is the empty set. The format
//! is kept byte-compatible with deployed nodes. Parsing happens once, here,
//! and everything past this module works on [`ControlMessage`].

use serde::{Deserialize, Serialize};

use crate::node::{NodeDescriptor, NodeIdentity, TopicSet};

pub const FIELD_SEPARATOR: char = '-';

/// Marks the end of an introduction notice.
pub const NOTICE_TERMINATOR: char = '*';

pub const REGISTER_TAG: &str = "nn";
pub const DEPART_TAG: &str = "cld";
pub const INTRODUCTION_TAG: &str = "ct";

/// Field count of a register or introduction record, tag included.
const DESCRIPTOR_FIELDS: usize = 5;

// ── Operator commands ─────────────────────────────────────────────────────────

/// Maintenance command pushed verbatim to every registered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorCommand {
    Shutdown,
    Reboot,
}

impl OperatorCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::Reboot => "reboot",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "shutdown" => Some(Self::Shutdown),
            "reboot" => Some(Self::Reboot),
            _ => None,
        }
    }
}

// ── Messages ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// A node announcing itself and its topic sets.
    Register(NodeDescriptor),
    /// A node leaving. Carries the hostname only.
    Depart { hostname: String },
    /// Broker telling a node about a peer it matches with.
    Introduction(NodeDescriptor),
    /// Broker-issued maintenance command.
    Operator(OperatorCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    #[error("frame is not valid UTF-8")]
    NotUtf8,
    #[error("empty frame")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("{command}: missing field '{field}'")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },
    #[error("{command}: control character in field '{field}'")]
    ControlCharacter {
        command: &'static str,
        field: &'static str,
    },
    #[error("{command}: expected {expected} fields, got {got}")]
    TooManyFields {
        command: &'static str,
        expected: usize,
        got: usize,
    },
}

impl ControlMessage {
    /// Parse one raw frame. Trailing CR/LF is ignored.
    pub fn parse_bytes(frame: &[u8]) -> Result<Self, WireError> {
        let text = std::str::from_utf8(frame).map_err(|_| WireError::NotUtf8)?;
        Self::parse(text)
    }

    /// Parse one frame of text.
    pub fn parse(frame: &str) -> Result<Self, WireError> {
        let frame = frame.trim_end_matches(['\r', '\n']);
        if frame.is_empty() {
            return Err(WireError::Empty);
        }

        if let Some(cmd) = OperatorCommand::from_wire(frame) {
            return Ok(Self::Operator(cmd));
        }

        let fields: Vec<&str> = frame.split(FIELD_SEPARATOR).collect();
        match fields[0] {
            REGISTER_TAG => parse_descriptor(REGISTER_TAG, &fields).map(Self::Register),
            INTRODUCTION_TAG => {
                // The terminator is glued to the last field.
                let body = frame.strip_suffix(NOTICE_TERMINATOR).unwrap_or(frame);
                let fields: Vec<&str> = body.split(FIELD_SEPARATOR).collect();
                parse_descriptor(INTRODUCTION_TAG, &fields).map(Self::Introduction)
            }
            DEPART_TAG => {
                let hostname = match fields.get(1) {
                    Some(h) if !h.is_empty() => h,
                    _ => {
                        return Err(WireError::MissingField {
                            command: DEPART_TAG,
                            field: "hostname",
                        })
                    }
                };
                if fields.len() > 2 {
                    return Err(WireError::TooManyFields {
                        command: DEPART_TAG,
                        expected: 2,
                        got: fields.len(),
                    });
                }
                reject_control(DEPART_TAG, "hostname", hostname)?;
                Ok(Self::Depart {
                    hostname: (*hostname).to_owned(),
                })
            }
            other => Err(WireError::UnknownCommand(other.to_owned())),
        }
    }

    /// Encode to the on-wire text form.
    pub fn encode(&self) -> String {
        match self {
            Self::Register(node) => format!("{REGISTER_TAG}{FIELD_SEPARATOR}{node}"),
            Self::Depart { hostname } => format!("{DEPART_TAG}{FIELD_SEPARATOR}{hostname}"),
            Self::Introduction(node) => introduction(node),
            Self::Operator(cmd) => cmd.as_str().to_owned(),
        }
    }
}

/// Introduction notice naming `peer`, terminator included.
pub fn introduction(peer: &NodeDescriptor) -> String {
    format!("{INTRODUCTION_TAG}{FIELD_SEPARATOR}{peer}{NOTICE_TERMINATOR}")
}

fn parse_descriptor(command: &'static str, fields: &[&str]) -> Result<NodeDescriptor, WireError> {
    const NAMES: [&str; DESCRIPTOR_FIELDS] =
        ["command", "hostname", "ip", "capabilities", "interests"];

    if fields.len() < DESCRIPTOR_FIELDS {
        return Err(WireError::MissingField {
            command,
            field: NAMES[fields.len()],
        });
    }
    if fields.len() > DESCRIPTOR_FIELDS {
        return Err(WireError::TooManyFields {
            command,
            expected: DESCRIPTOR_FIELDS,
            got: fields.len(),
        });
    }
    if fields[1].is_empty() {
        return Err(WireError::MissingField {
            command,
            field: "hostname",
        });
    }
    if fields[2].is_empty() {
        return Err(WireError::MissingField { command, field: "ip" });
    }
    for (name, value) in NAMES.iter().zip(fields).skip(1) {
        reject_control(command, *name, value)?;
    }

    Ok(NodeDescriptor::new(
        NodeIdentity::new(fields[1], fields[2]),
        TopicSet::parse(fields[3]),
        TopicSet::parse(fields[4]),
    ))
}

/// Fields are rendered one node per line; no field may contain a line break
/// or any other control character.
fn reject_control(command: &'static str, field: &'static str, value: &str) -> Result<(), WireError> {
    if value.chars().any(char::is_control) {
        return Err(WireError::ControlCharacter { command, field });
    }
    Ok(())
}
