//! Session evidence and protected-view gating

pub mod guard;
pub mod navigator;
pub mod store;

pub use guard::SessionGuard;
pub use navigator::{Navigator, Route};
pub use store::{MemorySessionStore, SessionStore};
