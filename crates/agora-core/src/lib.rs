//! Core types and components for the Agora discussion engine.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the reaction toggle state machine, comment-tree assembly, and the
//! validation order of every write; storage is reached only through the
//! traits in [`store`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod comment;
pub mod discussion;
pub mod error;
pub mod id;
pub mod identity;
pub mod post;
pub mod reaction;
pub mod store;
pub mod user;

pub use discussion::Discussion;
pub use error::{Error, Result, StorageError};

#[cfg(test)]
mod testing;
