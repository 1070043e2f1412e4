//! Models module
//!
//! Defines the data structures shared by every pipeline stage: cell values,
//! the row-oriented working table and the nested documents handed to the store.

pub mod document;
pub mod enums;
pub mod table;
pub mod value;

pub use document::{Document, ID_KEY, Node};
pub use enums::*;
pub use table::{Record, Table};
pub use value::{DATE_DISPLAY_FORMAT, FieldValue};
