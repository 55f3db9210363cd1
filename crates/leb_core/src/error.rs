use std::io;

use thiserror::Error;

/// Failures while decoding raw bytes. Any of these aborts the load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid node index {node_index:#06X} at offset {offset:#X}")]
    InvalidNodeIndex { offset: usize, node_index: u16 },
    #[error("buffer truncated: needed {needed} bytes at offset {offset:#X}, buffer is {len} bytes")]
    TruncatedBuffer {
        offset: usize,
        needed: usize,
        len: usize,
    },
    #[error("unsupported room height {0}, expected 8 (3D) or 2 (2D)")]
    UnsupportedRoomHeight(u16),
    #[error("invalid parameter tag {tag:#X} at offset {offset:#X}")]
    InvalidVariantTag { offset: usize, tag: u32 },
    #[error("name at offset {offset:#X} is not valid UTF-8")]
    InvalidName { offset: usize },
    #[error("container nesting too deep at offset {offset:#X}")]
    NestingTooDeep { offset: usize },
}

/// The container decoded, but does not have the shape of a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("missing required section '{0}'")]
    MissingRequiredSection(&'static str),
    #[error("malformed section '{section}': {reason}")]
    MalformedSection {
        section: &'static str,
        reason: &'static str,
    },
}

/// A mutation or a repack was rejected. The model is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("duplicate actor key {0:#018X}")]
    DuplicateActorKey(u64),
    #[error("levels require at least 1 actor of type {type_id:#X}")]
    RequiredActorTypeRemoved { type_id: u16 },
    #[error("actor index {index} out of range, room has {len} actors")]
    ActorIndexOutOfRange { index: usize, len: usize },
    #[error("{field} value {value} cannot be represented")]
    ValueOutOfRange { field: &'static str, value: u64 },
    #[error("invalid name {0:?}: names cannot contain NUL bytes")]
    InvalidName(String),
    #[error("unknown actor type '{0}'")]
    UnknownActorType(String),
}

#[derive(Debug, Error)]
pub enum LebError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
