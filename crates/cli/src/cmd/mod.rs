//! CLI command implementations

pub mod backups;
pub mod config;
pub mod export;
pub mod import;
pub mod init;
pub mod list;
pub mod load;
pub mod push;
pub mod restore;
pub mod status;
pub mod sync;
pub mod watch;
