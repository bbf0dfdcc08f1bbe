//! Client-side synchronization core for a social posting app
//!
//! Provides:
//! - **SessionGuard**: gates protected views on locally held session evidence
//! - **FeedPaginator**: loads a feed once and reveals it page by page as the
//!   viewer nears the end of the visible list
//! - **MutationCoordinator**: reactions, saves, comments and post edits with
//!   confirm-then-apply reconciliation and double-submit suppression
//! - **HttpApiClient**: the remote API boundary over HTTP
//!
//! # Example
//!
//! ```rust,no_run
//! use social_sync::{
//!     Config, FeedPaginator, FeedSource, HttpApiClient, MemorySessionStore,
//!     MutationCoordinator, Navigator, Route, SessionGuard,
//! };
//! use std::sync::Arc;
//!
//! struct Router;
//!
//! impl Navigator for Router {
//!     fn navigate(&self, route: Route) {
//!         println!("navigate to {:?}", route);
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     social_sync::logging::init_tracing(&config.logging);
//!
//!     let store = Arc::new(MemorySessionStore::new());
//!     let api = Arc::new(HttpApiClient::new(&config.api, config.session.clone(), store.clone())?);
//!     let session = Arc::new(SessionGuard::new(store, api.clone(), Arc::new(Router), config.session.clone()));
//!
//!     let feed = session.protect(|_identity| {
//!         FeedPaginator::new(api.clone(), session.clone(), FeedSource::All, config.feed.page_size)
//!     })?;
//!     let _ = feed.load_initial().await;
//!
//!     let coordinator = MutationCoordinator::new(api.clone(), session.clone());
//!     if let Some(post) = feed.visible_posts().first() {
//!         let outcome = coordinator.toggle_reaction(&feed.handle(), &post.id).await;
//!         println!("{:?}", outcome);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod detail;
pub mod domain;
pub mod error;
pub mod feed;
pub mod logging;
pub mod mutation;
pub mod repository;
pub mod session;

// Re-export main types for convenience
pub use config::Config;
pub use detail::{DetailHandle, PostDetailView};
pub use domain::{
    Comment, EntityId, Identity, LoginGrant, Post, PostDetail, PostId, SessionStatus,
};
pub use error::{ErrorKind, SyncError, SyncResult};
pub use feed::{
    proximity_channel, FeedHandle, FeedPaginator, FeedPhase, FeedSnapshot, FeedSource,
    ProximitySignal,
};
pub use mutation::{
    CommentDraft, MutationAction, MutationCoordinator, MutationOutcome, PatchTarget, PostPatch,
};
pub use repository::{HttpApiClient, PostRepository, SessionApi};
pub use session::{MemorySessionStore, Navigator, Route, SessionGuard, SessionStore};
