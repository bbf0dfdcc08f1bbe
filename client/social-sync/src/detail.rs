//! Single-post view with its comment thread

use crate::domain::{Comment, Post, PostDetail, PostId};
use crate::error::{SyncError, SyncResult};
use crate::mutation::{PatchTarget, PostPatch};
use crate::repository::PostRepository;
use crate::session::SessionGuard;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

#[derive(Default)]
struct DetailState {
    detail: Option<PostDetail>,
    removed: bool,
    last_error: Option<SyncError>,
}

pub(crate) struct DetailInner {
    posts: Arc<dyn PostRepository>,
    session: Arc<SessionGuard>,
    post_id: PostId,
    state: Mutex<DetailState>,
}

impl DetailInner {
    async fn load(&self) -> SyncResult<()> {
        let result = self.posts.get_post_detail(&self.post_id).await;

        let mut state = self.state.lock();
        match result {
            Ok(detail) => {
                info!(
                    post_id = %self.post_id,
                    comments = detail.comments.len(),
                    "Post detail loaded"
                );
                state.detail = Some(detail);
                state.removed = false;
                state.last_error = None;
                Ok(())
            }
            Err(e) => {
                state.last_error = Some(e.clone());
                drop(state);

                warn!(post_id = %self.post_id, error = %e, "Post detail load failed");
                self.session.intercept(&e);
                Err(e)
            }
        }
    }

    fn apply(&self, patch: &PostPatch) -> bool {
        if patch.post_id() != &self.post_id {
            return false;
        }

        let mut state = self.state.lock();
        if let PostPatch::Removed { .. } = patch {
            let had_post = state.detail.take().is_some();
            state.removed = true;
            return had_post;
        }

        let Some(detail) = state.detail.as_mut() else {
            return false;
        };

        if let PostPatch::CommentAdded { comment, .. } = patch {
            if detail.comments.iter().any(|c| c.id == comment.id) {
                debug!(comment_id = %comment.id, "Comment already present");
                return false;
            }
            detail.comments.push(comment.clone());
        }
        patch.apply_to(&mut detail.post)
    }
}

/// Owner of one post's detail state
pub struct PostDetailView {
    inner: Arc<DetailInner>,
}

impl PostDetailView {
    pub fn new(posts: Arc<dyn PostRepository>, session: Arc<SessionGuard>, post_id: PostId) -> Self {
        Self {
            inner: Arc::new(DetailInner {
                posts,
                session,
                post_id,
                state: Mutex::new(DetailState::default()),
            }),
        }
    }

    pub async fn load(&self) -> SyncResult<()> {
        self.inner.load().await
    }

    pub fn post_id(&self) -> &PostId {
        &self.inner.post_id
    }

    pub fn post(&self) -> Option<Post> {
        self.inner
            .state
            .lock()
            .detail
            .as_ref()
            .map(|d| d.post.clone())
    }

    /// Comments, oldest first
    pub fn comments(&self) -> Vec<Comment> {
        self.inner
            .state
            .lock()
            .detail
            .as_ref()
            .map(|d| d.comments.clone())
            .unwrap_or_default()
    }

    pub fn is_removed(&self) -> bool {
        self.inner.state.lock().removed
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.inner.state.lock().last_error.clone()
    }

    pub fn handle(&self) -> DetailHandle {
        DetailHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Weak handle through which mutations reach a detail view
#[derive(Clone)]
pub struct DetailHandle {
    inner: Weak<DetailInner>,
}

#[async_trait]
impl PatchTarget for DetailHandle {
    fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn find(&self, post_id: &PostId) -> Option<Post> {
        let inner = self.inner.upgrade()?;
        let state = inner.state.lock();
        state
            .detail
            .as_ref()
            .filter(|d| &d.post.id == post_id)
            .map(|d| d.post.clone())
    }

    fn apply(&self, patch: &PostPatch) -> SyncResult<bool> {
        let inner = self.inner.upgrade().ok_or(SyncError::ViewGone)?;
        Ok(inner.apply(patch))
    }

    async fn reload(&self) -> SyncResult<()> {
        let inner = self.inner.upgrade().ok_or(SyncError::ViewGone)?;
        inner.load().await
    }
}
