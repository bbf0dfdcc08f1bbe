use crate::domain::PostId;

/// Navigation targets the core can request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Login entry point
    Login,
    Feed,
    PostDetail(PostId),
}

/// Presentation-side router
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}
