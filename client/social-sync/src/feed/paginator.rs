/// Feed paginator
///
/// State transitions:
/// - Idle → Loading: `load_initial` / `refresh`
/// - Loading → Loaded: fetch succeeded, first page revealed
/// - Loading → Failed: fetch failed, snapshot is empty with nothing more to show
/// - Loaded → Loaded: `load_more` reveals the next page of fetched posts
///
/// Reveals are synchronous, so a reveal never overlaps a fetch. Only the most
/// recent load may write its result.
use crate::domain::{Post, PostId};
use crate::error::{SyncError, SyncResult};
use crate::feed::proximity::{ObserverSlot, ProximityReceiver, ProximitySignal};
use crate::feed::snapshot::FeedSnapshot;
use crate::mutation::{PatchTarget, PostPatch};
use crate::repository::PostRepository;
use crate::session::SessionGuard;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedPhase {
    Idle,
    Loading,
    Loaded,
    Failed,
}

/// Which remote collection the feed shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedSource {
    /// Every visible post
    All,
    /// Posts written by the current user
    Mine,
    /// Posts the current user has saved
    Saved,
}

struct FeedState {
    phase: FeedPhase,
    snapshot: FeedSnapshot,
    last_error: Option<SyncError>,
    load_generation: u64,
}

pub(crate) struct FeedInner {
    posts: Arc<dyn PostRepository>,
    session: Arc<SessionGuard>,
    source: FeedSource,
    page_size: usize,
    state: Mutex<FeedState>,
    observer: ObserverSlot,
}

impl FeedInner {
    async fn fetch(&self) -> SyncResult<Vec<Post>> {
        match self.source {
            FeedSource::All => self.posts.list_posts().await,
            FeedSource::Mine => self.posts.list_my_posts().await,
            FeedSource::Saved => Ok(self
                .posts
                .list_posts()
                .await?
                .into_iter()
                .filter(|p| p.saved_by_current_user)
                .collect()),
        }
    }

    async fn load(&self) -> SyncResult<()> {
        let generation = {
            let mut state = self.state.lock();
            state.phase = FeedPhase::Loading;
            state.load_generation += 1;
            state.load_generation
        };
        debug!(source = ?self.source, generation, "Loading feed");

        let result = self.fetch().await;

        let mut state = self.state.lock();
        if state.load_generation != generation {
            debug!(generation, "Discarding superseded feed load");
            return Err(SyncError::Superseded);
        }

        match result {
            Ok(posts) => {
                state.snapshot = FeedSnapshot::from_posts(posts, self.page_size);
                state.phase = FeedPhase::Loaded;
                state.last_error = None;
                info!(
                    source = ?self.source,
                    total = state.snapshot.total(),
                    reveal_count = state.snapshot.reveal_count(),
                    has_more = state.snapshot.has_more(),
                    "Feed loaded"
                );
                Ok(())
            }
            Err(e) => {
                state.snapshot = FeedSnapshot::empty();
                state.phase = FeedPhase::Failed;
                state.last_error = Some(e.clone());
                drop(state);

                warn!(source = ?self.source, error = %e, "Feed load failed");
                self.session.intercept(&e);
                Err(e)
            }
        }
    }

    fn reveal(&self) -> bool {
        let mut state = self.state.lock();
        if state.phase == FeedPhase::Loading || !state.snapshot.has_more() {
            return false;
        }

        let revealed = state.snapshot.reveal_next(self.page_size);
        debug!(
            revealed,
            reveal_count = state.snapshot.reveal_count(),
            has_more = state.snapshot.has_more(),
            "Revealed next page"
        );
        revealed > 0
    }

    fn on_proximity(&self, signal: &ProximitySignal) -> bool {
        {
            let state = self.state.lock();
            if state.snapshot.last_visible_id() != Some(&signal.last_visible) {
                debug!(post_id = %signal.last_visible, "Ignoring stale proximity signal");
                return false;
            }
        }
        self.reveal()
    }

    fn apply(&self, patch: &PostPatch) -> bool {
        let mut state = self.state.lock();
        let changed = state.snapshot.apply(patch);

        // A saved-posts feed only lists saved posts
        if let (FeedSource::Saved, PostPatch::Saved { post_id, saved: false }) = (self.source, patch)
        {
            return state.snapshot.remove(post_id) || changed;
        }
        changed
    }
}

/// Owner of a feed snapshot. Dropping it tears the feed down: outstanding
/// mutations stop applying and the proximity listener is released.
pub struct FeedPaginator {
    inner: Arc<FeedInner>,
}

impl FeedPaginator {
    pub fn new(
        posts: Arc<dyn PostRepository>,
        session: Arc<SessionGuard>,
        source: FeedSource,
        page_size: usize,
    ) -> Self {
        Self {
            inner: Arc::new(FeedInner {
                posts,
                session,
                source,
                page_size: page_size.max(1),
                state: Mutex::new(FeedState {
                    phase: FeedPhase::Idle,
                    snapshot: FeedSnapshot::empty(),
                    last_error: None,
                    load_generation: 0,
                }),
                observer: ObserverSlot::default(),
            }),
        }
    }

    /// Fetch the candidate set and reveal the first page.
    ///
    /// Fails soft: on error the snapshot is empty, `has_more` is false and the
    /// error is returned for display. Nothing is retried.
    pub async fn load_initial(&self) -> SyncResult<()> {
        self.inner.load().await
    }

    /// Replace the snapshot wholesale
    pub async fn refresh(&self) -> SyncResult<()> {
        self.inner.load().await
    }

    /// Reveal the next page. No-op while loading or when nothing is left.
    pub fn load_more(&self) -> bool {
        self.inner.reveal()
    }

    /// Handle one proximity signal. Signals naming anything other than the
    /// current last visible post are stale and ignored.
    pub fn on_proximity(&self, signal: &ProximitySignal) -> bool {
        self.inner.on_proximity(signal)
    }

    /// Subscribe to proximity signals, releasing any previous subscription.
    ///
    /// Must be called from within a Tokio runtime, since the listener is a
    /// task spawned onto it. Elsewhere this returns `SyncError::Runtime` and
    /// leaves the current subscription in place.
    pub fn attach(&self, signals: ProximityReceiver) -> SyncResult<()> {
        let weak = Arc::downgrade(&self.inner);
        self.inner.observer.install(signals, move |signal| {
            weak.upgrade().map(|inner| inner.on_proximity(&signal))
        })
    }

    pub fn detach(&self) -> bool {
        self.inner.observer.release()
    }

    pub fn is_observing(&self) -> bool {
        self.inner.observer.is_active()
    }

    pub fn handle(&self) -> FeedHandle {
        FeedHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn source(&self) -> FeedSource {
        self.inner.source
    }

    pub fn phase(&self) -> FeedPhase {
        self.inner.state.lock().phase
    }

    pub fn visible_posts(&self) -> Vec<Post> {
        self.inner.state.lock().snapshot.visible().to_vec()
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.state.lock().snapshot.clone()
    }

    pub fn reveal_count(&self) -> usize {
        self.inner.state.lock().snapshot.reveal_count()
    }

    pub fn has_more(&self) -> bool {
        self.inner.state.lock().snapshot.has_more()
    }

    pub fn last_error(&self) -> Option<SyncError> {
        self.inner.state.lock().last_error.clone()
    }
}

/// Weak handle through which mutations reach the feed
#[derive(Clone)]
pub struct FeedHandle {
    inner: Weak<FeedInner>,
}

#[async_trait]
impl PatchTarget for FeedHandle {
    fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    fn find(&self, post_id: &PostId) -> Option<Post> {
        let inner = self.inner.upgrade()?;
        let state = inner.state.lock();
        state.snapshot.get(post_id).cloned()
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use crate::domain::{Comment, LoginGrant, PostDetail, SessionStatus};
    use crate::repository::SessionApi;
    use crate::session::{MemorySessionStore, Navigator, Route};
    use chrono::{Duration, TimeZone, Utc};

    struct NoopNavigator;

    impl Navigator for NoopNavigator {
        fn navigate(&self, _route: Route) {}
    }

    struct NoopSessionApi;

    #[async_trait]
    impl SessionApi for NoopSessionApi {
        async fn validate_session(&self) -> SyncResult<SessionStatus> {
            Ok(SessionStatus::invalid())
        }

        async fn login(&self, _: &str, _: &str) -> SyncResult<LoginGrant> {
            Err(SyncError::Rejected("Login failed".into()))
        }

        async fn update_profile(&self, _: &str, _: &str) -> SyncResult<bool> {
            Ok(false)
        }

        async fn delete_account(&self) -> SyncResult<bool> {
            Ok(false)
        }

        async fn logout(&self) -> SyncResult<()> {
            Ok(())
        }
    }

    struct FixedPosts(SyncResult<Vec<Post>>);

    #[async_trait]
    impl PostRepository for FixedPosts {
        async fn list_posts(&self) -> SyncResult<Vec<Post>> {
            self.0.clone()
        }
        async fn list_my_posts(&self) -> SyncResult<Vec<Post>> {
            self.0.clone()
        }
        async fn get_post_detail(&self, _: &PostId) -> SyncResult<PostDetail> {
            Err(SyncError::NotFound("Post".into()))
        }
        async fn create_post(&self, _: &str) -> SyncResult<bool> {
            Ok(true)
        }
        async fn update_post(&self, _: &PostId, _: &str) -> SyncResult<bool> {
            Ok(true)
        }
        async fn delete_post(&self, _: &PostId) -> SyncResult<bool> {
            Ok(true)
        }
        async fn toggle_reaction(&self, _: &PostId) -> SyncResult<bool> {
            Ok(true)
        }
        async fn toggle_save(&self, _: &PostId) -> SyncResult<bool> {
            Ok(true)
        }
        async fn add_comment(&self, _: &PostId, _: &str) -> SyncResult<Comment> {
            Err(SyncError::Network("unused".into()))
        }
    }

    fn posts(n: usize) -> Vec<Post> {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Post {
                id: (i as u64 + 1).into(),
                author_handle: "alice".into(),
                content: format!("post {}", i),
                created_at: base + Duration::minutes(i as i64),
                likes_count: 0,
                comments_count: 0,
                liked_by_current_user: false,
                saved_by_current_user: i % 2 == 0,
            })
            .collect()
    }

    fn paginator(result: SyncResult<Vec<Post>>, source: FeedSource) -> FeedPaginator {
        let session = Arc::new(SessionGuard::new(
            Arc::new(MemorySessionStore::new()),
            Arc::new(NoopSessionApi),
            Arc::new(NoopNavigator),
            SessionConfig::default(),
        ));
        FeedPaginator::new(Arc::new(FixedPosts(result)), session, source, 6)
    }

    #[tokio::test]
    async fn test_fourteen_posts_reveal_in_three_pages() {
        let feed = paginator(Ok(posts(14)), FeedSource::All);
        assert_eq!(feed.phase(), FeedPhase::Idle);

        feed.load_initial().await.unwrap();
        assert_eq!(feed.phase(), FeedPhase::Loaded);
        assert_eq!(feed.reveal_count(), 6);
        assert!(feed.has_more());

        assert!(feed.load_more());
        assert_eq!(feed.reveal_count(), 12);
        assert!(feed.has_more());

        assert!(feed.load_more());
        assert_eq!(feed.reveal_count(), 14);
        assert!(!feed.has_more());

        assert!(!feed.load_more());
        assert_eq!(feed.reveal_count(), 14);
    }

    #[tokio::test]
    async fn test_failed_load_is_soft() {
        let feed = paginator(Err(SyncError::Network("down".into())), FeedSource::All);

        let result = feed.load_initial().await;

        assert_eq!(result, Err(SyncError::Network("down".into())));
        assert_eq!(feed.phase(), FeedPhase::Failed);
        assert!(feed.visible_posts().is_empty());
        assert!(!feed.has_more());
        assert!(!feed.load_more());
    }

    #[tokio::test]
    async fn test_saved_source_filters_and_splices() {
        let feed = paginator(Ok(posts(6)), FeedSource::Saved);
        feed.load_initial().await.unwrap();
        assert_eq!(feed.snapshot().total(), 3);

        let id = feed.visible_posts()[0].id.clone();
        let changed = feed
            .handle()
            .apply(&PostPatch::Saved {
                post_id: id.clone(),
                saved: false,
            })
            .unwrap();

        assert!(changed);
        assert!(feed.handle().find(&id).is_none());
        assert_eq!(feed.snapshot().total(), 2);
    }

    #[tokio::test]
    async fn test_stale_proximity_signal_ignored() {
        let feed = paginator(Ok(posts(14)), FeedSource::All);
        feed.load_initial().await.unwrap();

        let first_last = feed.visible_posts().last().unwrap().id.clone();
        let signal = ProximitySignal::new(first_last);

        assert!(feed.on_proximity(&signal));
        assert_eq!(feed.reveal_count(), 12);

        // Same scroll event delivered twice
        assert!(!feed.on_proximity(&signal));
        assert_eq!(feed.reveal_count(), 12);
    }

    #[tokio::test]
    async fn test_handle_dies_with_paginator() {
        let feed = paginator(Ok(posts(3)), FeedSource::All);
        let handle = feed.handle();
        assert!(handle.is_alive());

        drop(feed);

        assert!(!handle.is_alive());
        let patch = PostPatch::Removed {
            post_id: "1".into(),
        };
        assert_eq!(handle.apply(&patch), Err(SyncError::ViewGone));
        assert_eq!(handle.reload().await, Err(SyncError::ViewGone));
    }
}
