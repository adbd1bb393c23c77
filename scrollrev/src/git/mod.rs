//! Git integration for scrollrev.
//!
//! The worker thread owns the `git2::Repository` for its whole lifetime
//! (`Repository` is `!Send`) and answers [`types::DiffRequest`]s over the
//! event channel.
pub mod types;
pub mod worker;
