//! Channel-scoped state storage for courier.
//!
//! A [`StateStore`] keeps JSON values per channel and key, with an atomic
//! `update` for optimistic read-modify-write. Script runtimes persist their
//! call stacks through it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;
mod memory;
mod store;

pub use filesystem::FileSystemStateStore;
pub use memory::InMemoryStateStore;
pub use store::{StateStore, UpdateFn, updater};
