//! ntty Core - Shared types for the line relay
//!
//! This crate provides the domain types shared by the relay daemon:
//! the unit of broadcast (`TextRecord`), client identifiers, and the
//! codec that splits an input byte stream into records.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod client;
pub mod codec;
pub mod error;
pub mod record;

// Re-exports for convenience
pub use client::ClientId;
pub use codec::RecordCodec;
pub use error::CodecError;
pub use record::TextRecord;
