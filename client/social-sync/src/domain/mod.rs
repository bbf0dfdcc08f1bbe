pub mod models;

pub use models::{
    Comment, CommentId, EntityId, Identity, LoginGrant, Post, PostDetail, PostId, SessionStatus,
    UserId,
};
