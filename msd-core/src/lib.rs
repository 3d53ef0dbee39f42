//! Core library for the switch register-access protocol
//!
//! This crate provides the fundamental types shared by the indirect-window
//! and RMU crates: bit-field helpers, the logical register command model,
//! common types and error handling.

pub mod bitfield;
pub mod command;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use bitfield::{BitField, WordReader, WordWriter};
pub use command::{AvbBlock, BlockSelector, CommandOp, RegisterCommand};
pub use error::{Error, ErrorKind, Result};
pub use types::{FramingMode, MacAddr};
