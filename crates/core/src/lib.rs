//! Core data model for marksync
//!
//! This crate provides:
//! - The canonical bookmark [`Store`] (arena-indexed tree, atomic persistence)
//! - [`Node`] and the browser/root identifiers
//! - Dedup keys (normalized URL + folder path)
//! - The transient [`Forest`] exchanged with browser codecs
//! - Configuration and the shared [`Error`] type

pub mod config;
pub mod error;
pub mod forest;
pub mod fs;
pub mod key;
pub mod node;
pub mod store;
pub mod timestamp;

pub use config::{example_config, AppPaths, Config};
pub use error::{Error, Result};
pub use forest::Forest;
pub use key::{normalize_url, DedupKey, FolderPath};
pub use node::{Browser, BrowserFamily, Node, NodeKind, RootKind};
pub use store::{NodeUpdate, Store, StoreDocument};
