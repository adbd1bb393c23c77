//! Core of scrollrev: the viewport-driven diff content cache, the line-range
//! selection state machine and the sqlite comment store.
//!
//! Nothing in this crate touches the terminal or git; the binary supplies a
//! [`loader::DiffSource`] and drives a [`session::ReviewSession`].

pub mod cache;
pub mod config;
pub mod db;
pub mod diff;
pub mod error;
pub mod eviction;
pub mod layout;
pub mod loader;
pub mod order;
pub mod scheduler;
pub mod schema;
pub mod sections;
pub mod selection;
pub mod session;
pub mod types;
pub mod visibility;

pub use error::LoadError;
pub use types::{DiffContent, FileMeta, FileRef, LineEntry, Side};
