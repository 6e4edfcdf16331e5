//! ntty Daemon - Client registry and line broadcast server
//!
//! This crate provides the core infrastructure for the relay:
//! - `registry` - Client registry actor owning every live connection
//! - `server` - TCP listener setup and the connection acceptor
//! - `broadcast` - The loop that feeds input records to the registry
//! - `relay` - Wiring of the three into one running process
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         nttyd                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐  Add      ┌─────────────────────────┐  │
//! │  │    Acceptor     │──────────▶│     RegistryActor       │  │
//! │  │  (TcpListener)  │           │  (owns client list)     │  │
//! │  └─────────────────┘           └────────────┬────────────┘  │
//! │                                    ▲        │ write_all     │
//! │  ┌─────────────────┐  Broadcast    │        ▼               │
//! │  │  BroadcastLoop  │───────────────┘  ┌─────────────────┐   │
//! │  │ (stdin records) │                  │  TCP clients    │   │
//! │  └─────────────────┘                  └─────────────────┘   │
//! │                                                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod broadcast;
pub mod cli;
pub mod config;
pub mod error;
pub mod registry;
pub mod relay;
pub mod server;
