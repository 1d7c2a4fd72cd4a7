//! Common types and wire protocol shared across the CDR stack.
//!
//! This crate provides:
//! - Text wire message parsing and formatting ([`wire`])
//! - Logical-name and reply-text definitions ([`types`])

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod types;
pub mod wire;

pub use types::LogicalName;
pub use wire::WireError;
