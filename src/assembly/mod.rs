//! Primary keys and document assembly
//!
//! Each surviving record becomes one document per top-level container. The
//! document's `_id` is the SHA-256 of its primary-key values, so re-running
//! an import upserts onto the same identifiers.

pub mod builder;
pub mod primary_key;

pub use builder::{AssembledDocument, DocumentAssembler, RootDocument};
pub use primary_key::{PK_SEPARATOR, document_id, primary_key_string};
