//! HTTP client for the remote social API
//!
//! Speaks the API's JSON wire format and maps responses onto the client error
//! taxonomy:
//! - 401 on any call → `SessionInvalid`
//! - 403 without a message (the server's unauthenticated reply) → `SessionInvalid`
//! - `{success: false, message}` → `Rejected(message)`
//! - 404 → `NotFound`
//! - transport failure → `Network`, deadline → `Timeout`
//!
//! Redirects are never followed. Toggle endpoints answer with a redirect to
//! the post on success and to the home page on refusal, so the `Location`
//! header is the acknowledgement.

use crate::config::{ApiConfig, SessionConfig};
use crate::domain::models::deserialize_timestamp;
use crate::domain::{
    Comment, EntityId, Identity, LoginGrant, Post, PostDetail, PostId, SessionStatus,
};
use crate::error::{SyncError, SyncResult};
use crate::repository::{PostRepository, SessionApi};
use crate::session::SessionStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, COOKIE, LOCATION, SET_COOKIE};
use reqwest::redirect::Policy;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const UNKNOWN_AUTHOR: &str = "unknown";

// ============================================================================
// Wire format
// ============================================================================

/// Entry of `GET /posts` and `GET /posts/mine`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirePost {
    id: EntityId,
    #[serde(default)]
    username: Option<String>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    content: String,
    #[serde(default)]
    likes_count: u32,
    #[serde(default)]
    comments_count: u32,
    #[serde(default)]
    is_liked: bool,
    #[serde(default)]
    is_saved: bool,
}

impl WirePost {
    fn into_post(self, fallback_author: &str) -> Post {
        Post {
            id: self.id,
            author_handle: self
                .username
                .unwrap_or_else(|| fallback_author.to_string()),
            content: self.content,
            created_at: self.created_at,
            likes_count: self.likes_count,
            comments_count: self.comments_count,
            liked_by_current_user: self.is_liked,
            saved_by_current_user: self.is_saved,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireUser {
    id: EntityId,
    username: String,
    #[serde(default)]
    email: Option<String>,
}

impl WireUser {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.id,
            username: self.username,
            email: self.email,
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireComment {
    id: EntityId,
    content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    user: WireUser,
}

impl WireComment {
    fn into_comment(self, post_id: &PostId) -> Comment {
        Comment {
            id: self.id,
            post_id: post_id.clone(),
            author_handle: self.user.username,
            content: self.content,
            created_at: self.created_at,
        }
    }
}

/// `GET /posts/{id}`
#[derive(Debug, Deserialize)]
struct WireDetail {
    id: EntityId,
    content: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    created_at: DateTime<Utc>,
    user: WireUser,
    #[serde(default)]
    likes_count: u32,
    #[serde(default)]
    is_liked_by_current_user: bool,
    #[serde(default)]
    is_saved_by_current_user: bool,
    #[serde(default)]
    comments: Vec<WireComment>,
}

impl WireDetail {
    fn into_detail(self) -> PostDetail {
        let mut comments: Vec<Comment> = self
            .comments
            .into_iter()
            .map(|c| c.into_comment(&self.id))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let post = Post {
            id: self.id,
            author_handle: self.user.username,
            content: self.content,
            created_at: self.created_at,
            likes_count: self.likes_count,
            comments_count: comments.len() as u32,
            liked_by_current_user: self.is_liked_by_current_user,
            saved_by_current_user: self.is_saved_by_current_user,
        };
        PostDetail { post, comments }
    }
}

/// Generic `{success, message}` acknowledgement
#[derive(Debug, Default, Deserialize)]
struct Ack {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    comment: Option<WireComment>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeEnvelope {
    #[serde(default)]
    user: Option<WireUser>,
}

/// `POST /login`
#[derive(Debug, Default, Deserialize)]
struct LoginEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    user: Option<WireUser>,
}

#[derive(Serialize)]
struct ContentBody<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct ProfileBody<'a> {
    username: &'a str,
    email: &'a str,
}

// ============================================================================
// Client
// ============================================================================

/// Credentialed HTTP client for the remote API
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    store: Arc<dyn SessionStore>,
    keys: SessionConfig,
}

impl HttpApiClient {
    pub fn new(
        api: &ApiConfig,
        keys: SessionConfig,
        store: Arc<dyn SessionStore>,
    ) -> SyncResult<Self> {
        let client = Client::builder()
            .redirect(Policy::none())
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            timeout: api.timeout(),
            store,
            keys,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn post_url(&self, post_id: &PostId, suffix: &str) -> String {
        self.url(&format!("{}{}", post_path(post_id), suffix))
    }

    /// Attach the session token as a cookie
    fn credentialed(&self, request: RequestBuilder) -> RequestBuilder {
        match self.store.get(&self.keys.token_key) {
            Some(token) if !token.is_empty() => {
                request.header(COOKIE, format!("{}={}", self.keys.token_key, token))
            }
            _ => request,
        }
    }

    fn current_username(&self) -> String {
        self.store
            .get(&self.keys.identity_key)
            .and_then(|raw| serde_json::from_str::<Identity>(&raw).ok())
            .map(|identity| identity.username)
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }

    /// Bound a request future by the configured deadline
    async fn with_deadline<T, F>(&self, future: F) -> SyncResult<T>
    where
        F: Future<Output = SyncResult<T>>,
    {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Remote API call timed out");
                Err(SyncError::Timeout(self.timeout))
            }
        }
    }

    /// Send a credentialed request; 401 becomes `SessionInvalid`
    async fn send(&self, request: RequestBuilder) -> SyncResult<Response> {
        let response = self.credentialed(request).send().await?;
        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(SyncError::SessionInvalid);
        }
        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> SyncResult<T> {
        self.with_deadline(async move {
            let response = self.send(request).await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(failure_from(status, &body));
            }
            Ok(serde_json::from_str(&body)?)
        })
        .await
    }

    /// Read an acknowledgement. A redirect is ok only when it lands on
    /// `confirm_path`; without one every redirect is a refusal.
    async fn fetch_ack(
        &self,
        request: RequestBuilder,
        confirm_path: Option<String>,
    ) -> SyncResult<bool> {
        self.with_deadline(async move {
            let response = self.send(request).await?;
            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok());
                let confirmed = redirect_confirms(location, confirm_path.as_deref());
                if !confirmed {
                    debug!(%status, ?location, "Redirect did not confirm the request");
                }
                return Ok(confirmed);
            }
            let body = response.text().await?;
            read_ack(status, &body)
        })
        .await
    }
}

fn post_path(post_id: &PostId) -> String {
    format!("/posts/{}", urlencoding::encode(post_id.as_str()))
}

/// Whether a redirect target is `confirm_path`, ignoring scheme, host, query
/// and a trailing slash
fn redirect_confirms(location: Option<&str>, confirm_path: Option<&str>) -> bool {
    let (Some(location), Some(expected)) = (location, confirm_path) else {
        return false;
    };
    let without_query = location.split(['?', '#']).next().unwrap_or_default();
    let path = match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => without_query,
    };
    path.trim_end_matches('/') == expected
}

/// Value of the named cookie among the `Set-Cookie` headers
fn session_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|cookie| cookie.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| key.trim() == name && !value.trim().is_empty())
        .map(|(_, value)| value.trim().to_string())
}

/// Map a non-success response onto an error
fn failure_from(status: StatusCode, body: &str) -> SyncError {
    let ack: Ack = serde_json::from_str(body).unwrap_or_default();
    match (status, ack.message) {
        (StatusCode::UNAUTHORIZED, _) | (StatusCode::FORBIDDEN, None) => {
            SyncError::SessionInvalid
        }
        (StatusCode::NOT_FOUND, message) => {
            SyncError::NotFound(message.unwrap_or_else(|| "Post".to_string()))
        }
        (_, Some(message)) => SyncError::Rejected(message),
        (status, None) => SyncError::Rejected(format!("Request failed with status {}", status)),
    }
}

/// Interpret an acknowledgement response.
///
/// Some endpoints reply with an HTML page, so any 2xx without an explicit
/// `success: false` counts as ok. A bare 403 is how the server turns away an
/// unauthenticated caller.
fn read_ack(status: StatusCode, body: &str) -> SyncResult<bool> {
    let ack: Ack = serde_json::from_str(body).unwrap_or_default();

    if status.is_success() {
        return match ack.success {
            Some(false) => match ack.message {
                Some(message) => Err(SyncError::Rejected(message)),
                None => Ok(false),
            },
            _ => Ok(true),
        };
    }

    match (status, ack.message) {
        (StatusCode::UNAUTHORIZED, _) | (StatusCode::FORBIDDEN, None) => {
            Err(SyncError::SessionInvalid)
        }
        (StatusCode::NOT_FOUND, _) => Err(failure_from(status, body)),
        (_, Some(message)) => Err(SyncError::Rejected(message)),
        (_, None) => Ok(false),
    }
}

#[async_trait]
impl PostRepository for HttpApiClient {
    async fn list_posts(&self) -> SyncResult<Vec<Post>> {
        let wire: Vec<WirePost> = self.fetch_json(self.client.get(self.url("/posts"))).await?;
        debug!(count = wire.len(), "Fetched posts");
        Ok(wire
            .into_iter()
            .map(|p| p.into_post(UNKNOWN_AUTHOR))
            .collect())
    }

    async fn list_my_posts(&self) -> SyncResult<Vec<Post>> {
        let wire: Vec<WirePost> = self
            .fetch_json(self.client.get(self.url("/posts/mine")))
            .await?;
        let author = self.current_username();
        debug!(count = wire.len(), "Fetched own posts");
        Ok(wire.into_iter().map(|p| p.into_post(&author)).collect())
    }

    async fn get_post_detail(&self, post_id: &PostId) -> SyncResult<PostDetail> {
        let wire: WireDetail = self
            .fetch_json(self.client.get(self.post_url(post_id, "")))
            .await?;
        Ok(wire.into_detail())
    }

    async fn create_post(&self, content: &str) -> SyncResult<bool> {
        let request = self
            .client
            .post(self.url("/posts/create"))
            .form(&ContentBody { content });
        self.fetch_ack(request, None).await
    }

    async fn update_post(&self, post_id: &PostId, content: &str) -> SyncResult<bool> {
        let request = self
            .client
            .put(self.post_url(post_id, "/edit"))
            .json(&ContentBody { content });
        self.fetch_ack(request, None).await
    }

    async fn delete_post(&self, post_id: &PostId) -> SyncResult<bool> {
        let request = self.client.delete(self.post_url(post_id, "/delete"));
        self.fetch_ack(request, None).await
    }

    async fn toggle_reaction(&self, post_id: &PostId) -> SyncResult<bool> {
        let request = self.client.post(self.post_url(post_id, "/react"));
        self.fetch_ack(request, Some(post_path(post_id))).await
    }

    async fn toggle_save(&self, post_id: &PostId) -> SyncResult<bool> {
        let request = self.client.post(self.post_url(post_id, "/save"));
        self.fetch_ack(request, Some(post_path(post_id))).await
    }

    async fn add_comment(&self, post_id: &PostId, content: &str) -> SyncResult<Comment> {
        let request = self
            .client
            .post(self.post_url(post_id, "/comments"))
            .form(&ContentBody { content });

        self.with_deadline(async move {
            let response = self.send(request).await?;
            let status = response.status();
            let body = response.text().await?;
            if !status.is_success() {
                return Err(failure_from(status, &body));
            }

            let envelope: CommentEnvelope = serde_json::from_str(&body)?;
            match (envelope.success, envelope.comment) {
                (true, Some(comment)) => Ok(comment.into_comment(post_id)),
                (_, _) => Err(SyncError::Rejected(
                    envelope
                        .message
                        .unwrap_or_else(|| "Failed to add comment".to_string()),
                )),
            }
        })
        .await
    }
}

#[async_trait]
impl SessionApi for HttpApiClient {
    async fn validate_session(&self) -> SyncResult<SessionStatus> {
        let envelope: MeEnvelope = self.fetch_json(self.client.get(self.url("/me"))).await?;
        Ok(match envelope.user {
            Some(user) => SessionStatus::valid(user.into_identity()),
            None => SessionStatus::invalid(),
        })
    }

    /// Uncredentialed; the session token arrives as a `Set-Cookie`
    async fn login(&self, email: &str, password: &str) -> SyncResult<LoginGrant> {
        let request = self
            .client
            .post(self.url("/login"))
            .json(&Credentials { email, password });

        self.with_deadline(async move {
            let response = request.send().await?;
            let status = response.status();
            let token = session_cookie(response.headers(), &self.keys.token_key);
            let body = response.text().await?;
            let envelope: LoginEnvelope = serde_json::from_str(&body).unwrap_or_default();

            if !status.is_success() || !envelope.success {
                return Err(SyncError::Rejected(
                    envelope
                        .message
                        .unwrap_or_else(|| "Login failed".to_string()),
                ));
            }

            let identity = envelope
                .user
                .ok_or_else(|| SyncError::Decode("Login response carried no user".to_string()))?
                .into_identity();
            let token = token.ok_or_else(|| {
                SyncError::Decode("Login response carried no session cookie".to_string())
            })?;
            Ok(LoginGrant { token, identity })
        })
        .await
    }

    async fn update_profile(&self, username: &str, email: &str) -> SyncResult<bool> {
        let request = self
            .client
            .put(self.url("/me"))
            .json(&ProfileBody { username, email });
        self.fetch_ack(request, None).await
    }

    async fn delete_account(&self) -> SyncResult<bool> {
        self.fetch_ack(self.client.delete(self.url("/me")), None).await
    }

    async fn logout(&self) -> SyncResult<()> {
        self.fetch_ack(self.client.post(self.url("/logout")), None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_ack_success_without_body() {
        assert_eq!(read_ack(StatusCode::OK, "<html></html>"), Ok(true));
    }

    #[test]
    fn test_read_ack_reports_server_message_verbatim() {
        let body = r#"{"success": false, "message": "Akses ditolak"}"#;
        assert_eq!(
            read_ack(StatusCode::FORBIDDEN, body),
            Err(SyncError::Rejected("Akses ditolak".into()))
        );
        assert_eq!(
            read_ack(StatusCode::OK, body),
            Err(SyncError::Rejected("Akses ditolak".into()))
        );
    }

    #[test]
    fn test_read_ack_unauthorized() {
        assert_eq!(
            read_ack(StatusCode::UNAUTHORIZED, ""),
            Err(SyncError::SessionInvalid)
        );
    }

    #[test]
    fn test_read_ack_refusal_without_message() {
        assert_eq!(read_ack(StatusCode::INTERNAL_SERVER_ERROR, ""), Ok(false));
    }

    #[test]
    fn test_bare_forbidden_is_session_invalid() {
        let page = "<html>403 Forbidden</html>";
        assert_eq!(
            read_ack(StatusCode::FORBIDDEN, page),
            Err(SyncError::SessionInvalid)
        );
        assert_eq!(
            failure_from(StatusCode::FORBIDDEN, page),
            SyncError::SessionInvalid
        );
        assert_eq!(
            failure_from(StatusCode::FORBIDDEN, r#"{"message": "Akses ditolak"}"#),
            SyncError::Rejected("Akses ditolak".into())
        );
    }

    #[test]
    fn test_redirect_confirms_only_the_post_page() {
        let expected = Some("/posts/3");
        assert!(redirect_confirms(Some("/posts/3"), expected));
        assert!(redirect_confirms(Some("http://api.local:6543/posts/3"), expected));
        assert!(redirect_confirms(Some("https://api.local/posts/3/?ref=x"), expected));
        assert!(!redirect_confirms(Some("http://api.local:6543/"), expected));
        assert!(!redirect_confirms(Some("/"), expected));
        assert!(!redirect_confirms(Some("/posts/13"), expected));
        assert!(!redirect_confirms(None, expected));
        assert!(!redirect_confirms(Some("/posts/3"), None));
    }

    #[test]
    fn test_session_cookie_picks_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.append(SET_COOKIE, "tracking=abc; Path=/".parse().unwrap());
        headers.append(SET_COOKIE, "auth_tkt=\"t0k3n!\"; Path=/; HttpOnly".parse().unwrap());
        headers.append(SET_COOKIE, "auth_tkt=second; Path=/; Domain=.api.local".parse().unwrap());

        assert_eq!(
            session_cookie(&headers, "auth_tkt"),
            Some("\"t0k3n!\"".to_string())
        );
        assert_eq!(session_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_detail_derives_comment_count_and_order() {
        let body = r#"{
            "id": 4,
            "content": "hi",
            "created_at": "2024-01-01T00:00:00",
            "user": {"id": 1, "username": "alice", "email": "a@x"},
            "likes_count": 2,
            "is_liked_by_current_user": true,
            "is_saved_by_current_user": false,
            "comments": [
                {"id": 2, "content": "second", "created_at": "2024-01-01T00:02:00", "user": {"id": 2, "username": "bob"}},
                {"id": 1, "content": "first", "created_at": "2024-01-01T00:01:00", "user": {"id": 3, "username": "carol"}}
            ]
        }"#;
        let detail = serde_json::from_str::<WireDetail>(body).unwrap().into_detail();

        assert_eq!(detail.post.comments_count, 2);
        assert_eq!(detail.post.likes_count, 2);
        assert!(detail.post.liked_by_current_user);
        assert_eq!(detail.comments[0].content, "first");
        assert_eq!(detail.comments[1].post_id, EntityId::from("4"));
    }

    #[test]
    fn test_wire_post_defaults() {
        let wire: WirePost =
            serde_json::from_str(r#"{"id": 3, "createdAt": "2024-02-02T10:00:00", "content": "x"}"#)
                .unwrap();
        let post = wire.into_post("me");
        assert_eq!(post.author_handle, "me");
        assert_eq!(post.likes_count, 0);
        assert!(!post.saved_by_current_user);
    }
}
