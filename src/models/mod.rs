//! Domain models for docsmith.
//!
//! # Core Concepts
//!
//! ## Document Content
//!
//! - [`ContentBlock`]: One unit of a source document (text or image), in reading order.
//!   A block sequence is an immutable snapshot for the duration of a generation cycle.
//! - [`ResolvedImage`]: Image bytes fetched through the document provider, base64-encoded
//!   for transport and inline rendering.
//! - [`OutboundBlock`]: A block produced from Markdown when publishing an article back
//!   to a document.
//!
//! ## Conversation
//!
//! - [`Session`]: One document-to-article conversation. Created `Active` with its first
//!   turn already populated; `Reset` is terminal.
//! - [`Message`]: One history entry. Every completed turn appends a user entry followed
//!   by an assistant entry.

mod block;
mod session;

pub use block::*;
pub use session::*;
