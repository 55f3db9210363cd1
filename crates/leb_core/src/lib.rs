//! Reading, editing and writing `.leb` room files.
//!
//! Bytes are parsed into a generic [`container::Container`], interpreted as
//! room sections by [`room`], edited through [`model::RoomModel`] and packed
//! back into bytes. [`core_api`] wraps this for front ends.

pub mod config;
pub mod container;
pub mod core_api;
pub mod error;
pub mod layout;
pub mod model;
pub mod reader;
pub mod room;
pub mod variant;

pub use config::EditorConfig;
pub use container::{Container, Entry, EntryPayload};
pub use error::{DomainError, LebError, ParseError, ValidationError};
pub use model::{ReferenceViolation, RoomModel};
pub use variant::VariantField;
