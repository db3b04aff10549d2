//! docsmith turns a structured document into a polished article through
//! iterative instructions, and publishes the result back as blocks.
//!
//! Content flows from document blocks through [`codec`] to a generation
//! backend, and from the generated Markdown through [`resolver`] for preview.
//! [`session`] keeps the per-conversation state machine over a [`store`];
//! [`workspace`] wires both to the external services and [`api`] exposes it
//! over HTTP.

pub mod api;
pub mod codec;
pub mod config;
pub mod documents;
pub mod error;
pub mod generator;
pub mod models;
pub mod resolver;
pub mod session;
pub mod store;
pub mod workspace;
