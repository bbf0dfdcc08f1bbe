//! Reconcile messages emitted after a confirmed mutation

use crate::domain::{Comment, Post, PostId};
use crate::error::SyncResult;
use async_trait::async_trait;

/// Exactly what changed on the server for one post.
///
/// Reaction and save patches carry the target state rather than a delta, so
/// applying one twice (or after a reload that already reflects it) is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostPatch {
    Reaction { post_id: PostId, liked: bool },
    Saved { post_id: PostId, saved: bool },
    CommentAdded { post_id: PostId, comment: Comment },
    ContentEdited { post_id: PostId, content: String },
    Removed { post_id: PostId },
}

impl PostPatch {
    pub fn post_id(&self) -> &PostId {
        match self {
            Self::Reaction { post_id, .. }
            | Self::Saved { post_id, .. }
            | Self::CommentAdded { post_id, .. }
            | Self::ContentEdited { post_id, .. }
            | Self::Removed { post_id } => post_id,
        }
    }

    /// Apply to a single post. Returns false when nothing changed.
    ///
    /// `Removed` is left to the owner of the collection.
    pub fn apply_to(&self, post: &mut Post) -> bool {
        match self {
            Self::Reaction { liked, .. } => {
                if post.liked_by_current_user == *liked {
                    return false;
                }
                post.toggle_like();
                true
            }
            Self::Saved { saved, .. } => {
                if post.saved_by_current_user == *saved {
                    return false;
                }
                post.toggle_save();
                true
            }
            Self::CommentAdded { .. } => {
                post.comments_count = post.comments_count.saturating_add(1);
                true
            }
            Self::ContentEdited { content, .. } => {
                if post.content == *content {
                    return false;
                }
                post.content = content.clone();
                true
            }
            Self::Removed { .. } => false,
        }
    }
}

/// A view that owns post state and accepts reconcile patches.
///
/// Implementations hold their owner weakly: once the view is torn down every
/// method reports it as gone instead of writing into dead state.
#[async_trait]
pub trait PatchTarget: Send + Sync {
    fn is_alive(&self) -> bool;

    /// Current local copy of a post
    fn find(&self, post_id: &PostId) -> Option<Post>;

    /// Apply a patch; `Err(ViewGone)` if the owner no longer exists
    fn apply(&self, patch: &PostPatch) -> SyncResult<bool>;

    /// Re-fetch the owner's state from the remote API
    async fn reload(&self) -> SyncResult<()>;
}
