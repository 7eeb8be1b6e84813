//! # ipset-exec - drive the `ipset` utility from Rust
//!
//! A thin binding around the `ipset` command-line tool. Every operation is
//! one synchronous subprocess invocation of the binary; listings are read
//! as XML (`list -o xml`) and decoded into typed records.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  IpSet (ipset.rs)                                           │
//! │    ├── create / add / del / test / destroy / flush ...      │
//! │    ├── list / list_sets / list_entries / list_set_names     │
//! │    └── refresh: temp set → populate → swap → destroy        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CommandExecutor (cmd_abstraction.rs)                       │
//! │    └── spawn, capture stdout/stderr, timeout, cancellation  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Listing decoder (listing.rs, quick-xml + serde)            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use ipset_exec::{IpSet, SetOptions};
//!
//! fn main() -> Result<(), ipset_exec::IpsetError> {
//!     let ipset = IpSet::new()?;
//!
//!     ipset.create("blocklist", "hash:net", &SetOptions::new().set("timeout", 300))?;
//!     ipset.add_unique("blocklist", "203.0.113.0/24", &SetOptions::new())?;
//!
//!     // Replace the contents without an empty window
//!     ipset.refresh("blocklist", ["198.51.100.7", "192.0.2.0/24"])?;
//!
//!     for entry in ipset.list_entries("blocklist")? {
//!         println!("{}", entry);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`ipset`] - The command executor and its operations
//! - [`listing`] - XML listing records and decoding
//! - [`options`] - Ordered create/add options
//! - [`cmd_abstraction`] - Process spawning abstraction (mockable)
//! - [`cancel`] - Cancellation token for in-flight invocations
//! - [`config`] - YAML configuration (binary, search path, timeout)
//! - [`error`] - Error taxonomy
//! - [`cli`] / [`commands`] - Command-line front end

pub mod cancel;
pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod error;
pub mod ipset;
pub mod listing;
pub mod options;

pub use cancel::CancelToken;
pub use config::Config;
pub use error::{FailureKind, IpsetError, Result};
pub use ipset::IpSet;
pub use listing::{MemberEntry, SetCollection, SetHeader, SetRecord};
pub use options::SetOptions;
