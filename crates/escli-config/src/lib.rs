#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! File-backed configuration store for the escli command-line client.
//!
//! Layout: `model.rs` (versioned configuration shapes), `migrate.rs`
//! (version detection and the migration chain), `store.rs` (`ConfigStore`
//! reading and explicitly saving the persisted document), `error.rs`.

pub mod error;
pub mod migrate;
pub mod model;
pub mod store;

pub use error::{ConfigError, ConfigResult};
pub use migrate::{ConfigDocument, migrate_v1};
pub use model::{Config, ConfigV1, ConfigV2, ConfigVersion};
pub use store::{CONFIG_PATH_ENV, ConfigLoader, ConfigStore};
