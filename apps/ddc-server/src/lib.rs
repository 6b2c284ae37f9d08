//! DDC Server Library
//!
//! Session-based builder and extractor for Digital Document Cards (DDC):
//! a PDF that visualizes a signed document and carries the original file
//! and its detached signatures as attachments.
//!
//! # Modules
//!
//! - `ddc`: card rendering and attachment extraction
//! - `scanner`: clamd antivirus client
//! - `session`: in-memory build and extract sessions
//! - `rpc`: JSON-RPC surface over the sessions
//! - `routes`: HTTP router

pub mod config;
pub mod ddc;
pub mod error;
pub mod routes;
pub mod rpc;
pub mod scanner;
pub mod session;
pub mod state;
