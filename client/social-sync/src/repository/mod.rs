//! Remote API boundary
//!
//! The remote API is the single source of truth for posts, comments and
//! reactions. Every call is credentialed with the current session evidence;
//! an auth rejection surfaces as `SyncError::SessionInvalid`.

pub mod http;

use crate::domain::{Comment, LoginGrant, Post, PostDetail, PostId, SessionStatus};
use crate::error::SyncResult;
use async_trait::async_trait;

pub use http::HttpApiClient;

/// Posts, comments and per-post social state.
///
/// Boolean results carry the server's `ok`: `Ok(false)` is a refusal without
/// a message, a refusal with a message is `SyncError::Rejected`.
#[async_trait]
pub trait PostRepository: Send + Sync {
    /// All visible posts, in whatever order the server returns them
    async fn list_posts(&self) -> SyncResult<Vec<Post>>;

    /// Posts authored by the current user
    async fn list_my_posts(&self) -> SyncResult<Vec<Post>>;

    async fn get_post_detail(&self, post_id: &PostId) -> SyncResult<PostDetail>;

    async fn create_post(&self, content: &str) -> SyncResult<bool>;

    async fn update_post(&self, post_id: &PostId, content: &str) -> SyncResult<bool>;

    async fn delete_post(&self, post_id: &PostId) -> SyncResult<bool>;

    /// Flip the current user's like. The response carries no count.
    async fn toggle_reaction(&self, post_id: &PostId) -> SyncResult<bool>;

    async fn toggle_save(&self, post_id: &PostId) -> SyncResult<bool>;

    /// Returns the comment as stored by the server
    async fn add_comment(&self, post_id: &PostId, content: &str) -> SyncResult<Comment>;
}

/// Session endpoints of the remote API
#[async_trait]
pub trait SessionApi: Send + Sync {
    async fn validate_session(&self) -> SyncResult<SessionStatus>;

    /// Exchange credentials for session evidence. Bad credentials are
    /// `SyncError::Rejected` with the server's message.
    async fn login(&self, email: &str, password: &str) -> SyncResult<LoginGrant>;

    async fn update_profile(&self, username: &str, email: &str) -> SyncResult<bool>;

    async fn delete_account(&self) -> SyncResult<bool>;

    async fn logout(&self) -> SyncResult<()>;
}
