/// Mutation coordinator
///
/// Confirm-then-apply: the remote call goes out first and local state moves
/// only after the server reports success. Nothing flips early, so a failure
/// leaves nothing to roll back. The coordinator never holds post state of its
/// own; it reads the originating view's copy and sends that view a patch.
use crate::domain::{Post, PostId};
use crate::error::{SyncError, SyncResult};
use crate::mutation::inflight::{InFlightRegistry, InFlightTicket, MutationAction};
use crate::mutation::patch::{PatchTarget, PostPatch};
use crate::repository::PostRepository;
use crate::session::SessionGuard;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Toast-equivalent result of a confirmed mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome {
    pub action: MutationAction,
    pub post_id: Option<PostId>,
    pub message: String,
}

/// Typed comment content; survives a failed submit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentDraft {
    content: String,
}

impl CommentDraft {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    pub fn set(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    pub fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    pub fn clear(&mut self) {
        self.content.clear();
    }
}

fn success_message(action: MutationAction) -> &'static str {
    match action {
        MutationAction::React => "Reaction updated",
        MutationAction::Save => "Saved posts updated",
        MutationAction::Comment => "Comment added",
        MutationAction::Create => "Post created",
        MutationAction::Update => "Post updated",
        MutationAction::Delete => "Post deleted",
    }
}

fn failure_message(action: MutationAction) -> &'static str {
    match action {
        MutationAction::React => "Failed to update reaction",
        MutationAction::Save => "Failed to update saved posts",
        MutationAction::Comment => "Failed to add comment",
        MutationAction::Create => "Failed to create post",
        MutationAction::Update => "Failed to update post",
        MutationAction::Delete => "Failed to delete post",
    }
}

fn require_content(content: &str, what: &str) -> SyncResult<()> {
    if content.trim().is_empty() {
        return Err(SyncError::Validation(format!("{} must not be empty", what)));
    }
    Ok(())
}

pub struct MutationCoordinator {
    posts: Arc<dyn PostRepository>,
    session: Arc<SessionGuard>,
    in_flight: InFlightRegistry,
}

impl MutationCoordinator {
    pub fn new(posts: Arc<dyn PostRepository>, session: Arc<SessionGuard>) -> Self {
        Self {
            posts,
            session,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Whether the control for this pair should be disabled
    pub fn is_pending(&self, post_id: &PostId, action: MutationAction) -> bool {
        self.in_flight.is_pending(Some(post_id), action)
    }

    /// Drop interest in an outstanding request; its response will be ignored
    pub fn cancel(&self, post_id: &PostId, action: MutationAction) -> bool {
        self.in_flight.cancel(Some(post_id), action)
    }

    pub fn in_flight(&self) -> &InFlightRegistry {
        &self.in_flight
    }

    /// Flip the like on a post.
    ///
    /// The server returns no count, so the new state is derived from the
    /// local copy read before the call.
    pub async fn toggle_reaction(
        &self,
        origin: &dyn PatchTarget,
        post_id: &PostId,
    ) -> SyncResult<MutationOutcome> {
        let prior = self.local_copy(origin, post_id)?;
        let ticket = self.in_flight.begin(Some(post_id), MutationAction::React)?;

        let ok = self
            .confirm(MutationAction::React, Some(post_id), self.posts.toggle_reaction(post_id))
            .await?;
        self.require_ok(ok, MutationAction::React)?;

        let patch = PostPatch::Reaction {
            post_id: post_id.clone(),
            liked: !prior.liked_by_current_user,
        };
        self.settle(&ticket, origin, MutationAction::React, patch)
    }

    pub async fn toggle_save(
        &self,
        origin: &dyn PatchTarget,
        post_id: &PostId,
    ) -> SyncResult<MutationOutcome> {
        let prior = self.local_copy(origin, post_id)?;
        let ticket = self.in_flight.begin(Some(post_id), MutationAction::Save)?;

        let ok = self
            .confirm(MutationAction::Save, Some(post_id), self.posts.toggle_save(post_id))
            .await?;
        self.require_ok(ok, MutationAction::Save)?;

        let patch = PostPatch::Saved {
            post_id: post_id.clone(),
            saved: !prior.saved_by_current_user,
        };
        self.settle(&ticket, origin, MutationAction::Save, patch)
    }

    /// Submit a comment. The draft is cleared only once the server has
    /// stored the comment.
    pub async fn add_comment(
        &self,
        origin: &dyn PatchTarget,
        post_id: &PostId,
        draft: &mut CommentDraft,
    ) -> SyncResult<MutationOutcome> {
        require_content(draft.as_str(), "Comment")?;
        let ticket = self.in_flight.begin(Some(post_id), MutationAction::Comment)?;

        let comment = self
            .confirm(
                MutationAction::Comment,
                Some(post_id),
                self.posts.add_comment(post_id, draft.as_str()),
            )
            .await?;
        draft.clear();

        let patch = PostPatch::CommentAdded {
            post_id: post_id.clone(),
            comment,
        };
        self.settle(&ticket, origin, MutationAction::Comment, patch)
    }

    /// Create a post, then reload the originating feed
    pub async fn create_post(
        &self,
        origin: &dyn PatchTarget,
        content: &str,
    ) -> SyncResult<MutationOutcome> {
        require_content(content, "Post content")?;
        let ticket = self.in_flight.begin(None, MutationAction::Create)?;

        let ok = self
            .confirm(MutationAction::Create, None, self.posts.create_post(content))
            .await?;
        self.require_ok(ok, MutationAction::Create)?;

        if !ticket.is_current() {
            return Err(SyncError::Superseded);
        }

        match origin.reload().await {
            Ok(()) => {}
            Err(SyncError::ViewGone) => debug!("Feed closed before refresh after create"),
            // The post exists; the feed already shows its own load error
            Err(e) => warn!(error = %e, "Refresh after create failed"),
        }

        info!("Post created");
        Ok(MutationOutcome {
            action: MutationAction::Create,
            post_id: None,
            message: success_message(MutationAction::Create).to_string(),
        })
    }

    pub async fn update_post(
        &self,
        origin: &dyn PatchTarget,
        post_id: &PostId,
        content: &str,
    ) -> SyncResult<MutationOutcome> {
        require_content(content, "Post content")?;
        let ticket = self.in_flight.begin(Some(post_id), MutationAction::Update)?;

        let ok = self
            .confirm(
                MutationAction::Update,
                Some(post_id),
                self.posts.update_post(post_id, content),
            )
            .await?;
        self.require_ok(ok, MutationAction::Update)?;

        let patch = PostPatch::ContentEdited {
            post_id: post_id.clone(),
            content: content.to_string(),
        };
        self.settle(&ticket, origin, MutationAction::Update, patch)
    }

    pub async fn delete_post(
        &self,
        origin: &dyn PatchTarget,
        post_id: &PostId,
    ) -> SyncResult<MutationOutcome> {
        let ticket = self.in_flight.begin(Some(post_id), MutationAction::Delete)?;

        let ok = self
            .confirm(MutationAction::Delete, Some(post_id), self.posts.delete_post(post_id))
            .await?;
        self.require_ok(ok, MutationAction::Delete)?;

        let patch = PostPatch::Removed {
            post_id: post_id.clone(),
        };
        self.settle(&ticket, origin, MutationAction::Delete, patch)
    }

    fn local_copy(&self, origin: &dyn PatchTarget, post_id: &PostId) -> SyncResult<Post> {
        if !origin.is_alive() {
            return Err(SyncError::ViewGone);
        }
        origin
            .find(post_id)
            .ok_or_else(|| SyncError::NotFound("Post".to_string()))
    }

    /// Await the remote call; auth rejections go through the session guard
    async fn confirm<T, F>(
        &self,
        action: MutationAction,
        post_id: Option<&PostId>,
        call: F,
    ) -> SyncResult<T>
    where
        F: Future<Output = SyncResult<T>>,
    {
        match call.await {
            Ok(value) => Ok(value),
            Err(e) => {
                if !self.session.intercept(&e) {
                    warn!(
                        action = action.as_str(),
                        post_id = ?post_id.map(|id| id.as_str()),
                        error = %e,
                        "Mutation failed"
                    );
                }
                Err(e)
            }
        }
    }

    fn require_ok(&self, ok: bool, action: MutationAction) -> SyncResult<()> {
        if ok {
            Ok(())
        } else {
            warn!(action = action.as_str(), "Server refused mutation");
            Err(SyncError::Rejected(failure_message(action).to_string()))
        }
    }

    /// Apply a confirmed patch if the request is still current and the view
    /// still exists
    fn settle(
        &self,
        ticket: &InFlightTicket,
        origin: &dyn PatchTarget,
        action: MutationAction,
        patch: PostPatch,
    ) -> SyncResult<MutationOutcome> {
        let post_id = patch.post_id().clone();

        if !ticket.is_current() {
            debug!(action = action.as_str(), post_id = %post_id, "Discarding superseded response");
            return Err(SyncError::Superseded);
        }

        match origin.apply(&patch) {
            Ok(changed) => {
                info!(action = action.as_str(), post_id = %post_id, changed, "Mutation applied");
                Ok(MutationOutcome {
                    action,
                    post_id: Some(post_id),
                    message: success_message(action).to_string(),
                })
            }
            Err(SyncError::ViewGone) => {
                debug!(action = action.as_str(), post_id = %post_id, "View gone, dropping patch");
                Err(SyncError::ViewGone)
            }
            Err(e) => Err(e),
        }
    }
}
