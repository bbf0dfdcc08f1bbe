#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use mockall::mock;
use parking_lot::Mutex;
use social_sync::config::SessionConfig;
use social_sync::{
    Comment, LoginGrant, MemorySessionStore, Navigator, Post, PostDetail, PostId, PostRepository,
    Route, SessionApi, SessionGuard, SessionStatus, SyncError, SyncResult,
};
use std::sync::Arc;
use tokio::sync::Semaphore;

// ============================================
// Mock Remote API
// ============================================

mock! {
    pub Posts {}

    #[async_trait]
    impl PostRepository for Posts {
        async fn list_posts(&self) -> SyncResult<Vec<Post>>;
        async fn list_my_posts(&self) -> SyncResult<Vec<Post>>;
        async fn get_post_detail(&self, post_id: &PostId) -> SyncResult<PostDetail>;
        async fn create_post(&self, content: &str) -> SyncResult<bool>;
        async fn update_post(&self, post_id: &PostId, content: &str) -> SyncResult<bool>;
        async fn delete_post(&self, post_id: &PostId) -> SyncResult<bool>;
        async fn toggle_reaction(&self, post_id: &PostId) -> SyncResult<bool>;
        async fn toggle_save(&self, post_id: &PostId) -> SyncResult<bool>;
        async fn add_comment(&self, post_id: &PostId, content: &str) -> SyncResult<Comment>;
    }
}

pub struct StubSessionApi;

#[async_trait]
impl SessionApi for StubSessionApi {
    async fn validate_session(&self) -> SyncResult<SessionStatus> {
        Ok(SessionStatus::invalid())
    }

    async fn login(&self, _email: &str, _password: &str) -> SyncResult<LoginGrant> {
        Err(SyncError::Rejected("Login failed".into()))
    }

    async fn update_profile(&self, _username: &str, _email: &str) -> SyncResult<bool> {
        Ok(true)
    }

    async fn delete_account(&self) -> SyncResult<bool> {
        Ok(true)
    }

    async fn logout(&self) -> SyncResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNavigator {
    pub routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().push(route);
    }
}

pub struct Session {
    pub guard: Arc<SessionGuard>,
    pub store: Arc<MemorySessionStore>,
    pub navigator: Arc<RecordingNavigator>,
}

/// Guard over a store holding valid evidence
pub fn logged_in() -> Session {
    let store = Arc::new(MemorySessionStore::with_entries([
        ("auth_tkt", "ticket"),
        ("user", r#"{"id": 1, "username": "alice"}"#),
    ]));
    let navigator = Arc::new(RecordingNavigator::default());
    let guard = Arc::new(SessionGuard::new(
        store.clone(),
        Arc::new(StubSessionApi),
        navigator.clone(),
        SessionConfig::default(),
    ));
    Session {
        guard,
        store,
        navigator,
    }
}

// ============================================
// Fixtures
// ============================================

pub fn post(id: &str, minute: i64, likes: u32, liked: bool) -> Post {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    Post {
        id: id.into(),
        author_handle: "alice".into(),
        content: format!("content of {}", id),
        created_at: base + Duration::minutes(minute),
        likes_count: likes,
        comments_count: 0,
        liked_by_current_user: liked,
        saved_by_current_user: false,
    }
}

/// `n` posts with ids "1".."n", newer ids created later
pub fn posts(n: usize) -> Vec<Post> {
    (1..=n)
        .map(|i| post(&i.to_string(), i as i64, 0, false))
        .collect()
}

pub fn comment(id: &str, post_id: &str, content: &str, minute: i64) -> Comment {
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 13, 0, 0).unwrap();
    Comment {
        id: id.into(),
        post_id: post_id.into(),
        author_handle: "bob".into(),
        content: content.into(),
        created_at: base + Duration::minutes(minute),
    }
}

// ============================================
// Gated repository
// ============================================

/// Wraps a repository; toggle calls block until the test releases a permit
pub struct GatedRepository {
    pub inner: Arc<dyn PostRepository>,
    pub gate: Arc<Semaphore>,
}

impl GatedRepository {
    pub fn new(inner: Arc<dyn PostRepository>) -> Self {
        Self {
            inner,
            gate: Arc::new(Semaphore::new(0)),
        }
    }

    async fn wait(&self) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
    }
}

#[async_trait]
impl PostRepository for GatedRepository {
    async fn list_posts(&self) -> SyncResult<Vec<Post>> {
        self.inner.list_posts().await
    }

    async fn list_my_posts(&self) -> SyncResult<Vec<Post>> {
        self.inner.list_my_posts().await
    }

    async fn get_post_detail(&self, post_id: &PostId) -> SyncResult<PostDetail> {
        self.inner.get_post_detail(post_id).await
    }

    async fn create_post(&self, content: &str) -> SyncResult<bool> {
        self.inner.create_post(content).await
    }

    async fn update_post(&self, post_id: &PostId, content: &str) -> SyncResult<bool> {
        self.inner.update_post(post_id, content).await
    }

    async fn delete_post(&self, post_id: &PostId) -> SyncResult<bool> {
        self.inner.delete_post(post_id).await
    }

    async fn toggle_reaction(&self, post_id: &PostId) -> SyncResult<bool> {
        self.wait().await;
        self.inner.toggle_reaction(post_id).await
    }

    async fn toggle_save(&self, post_id: &PostId) -> SyncResult<bool> {
        self.wait().await;
        self.inner.toggle_save(post_id).await
    }

    async fn add_comment(&self, post_id: &PostId, content: &str) -> SyncResult<Comment> {
        self.inner.add_comment(post_id, content).await
    }
}
