//! Ordered feed with a reveal window

use crate::domain::{Post, PostId};
use crate::mutation::PostPatch;
use std::collections::HashSet;

/// Fetched posts in feed order plus how many of them are visible.
///
/// Invariants:
/// - posts are sorted newest first, ties by id descending, ids unique
/// - `reveal_count <= posts.len()`
/// - `has_more == (posts.len() > reveal_count)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSnapshot {
    posts: Vec<Post>,
    reveal_count: usize,
}

impl FeedSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Sort, drop duplicate ids and reveal the first page
    pub fn from_posts(mut posts: Vec<Post>, page_size: usize) -> Self {
        posts.sort_by(Post::feed_order);

        let mut seen = HashSet::with_capacity(posts.len());
        posts.retain(|p| seen.insert(p.id.clone()));

        let reveal_count = page_size.min(posts.len());
        Self {
            posts,
            reveal_count,
        }
    }

    /// Reveal up to one more page. Returns how many posts became visible.
    pub fn reveal_next(&mut self, page_size: usize) -> usize {
        let before = self.reveal_count;
        self.reveal_count = self
            .reveal_count
            .saturating_add(page_size)
            .min(self.posts.len());
        self.reveal_count - before
    }

    pub fn visible(&self) -> &[Post] {
        &self.posts[..self.reveal_count]
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn total(&self) -> usize {
        self.posts.len()
    }

    pub fn reveal_count(&self) -> usize {
        self.reveal_count
    }

    pub fn has_more(&self) -> bool {
        self.posts.len() > self.reveal_count
    }

    pub fn last_visible_id(&self) -> Option<&PostId> {
        self.visible().last().map(|p| &p.id)
    }

    pub fn get(&self, post_id: &PostId) -> Option<&Post> {
        self.posts.iter().find(|p| &p.id == post_id)
    }

    /// Patch one post in place, or splice it out for `Removed`
    pub fn apply(&mut self, patch: &PostPatch) -> bool {
        match patch {
            PostPatch::Removed { post_id } => self.remove(post_id),
            _ => match self.posts.iter_mut().find(|p| &p.id == patch.post_id()) {
                Some(post) => patch.apply_to(post),
                None => false,
            },
        }
    }

    /// Splice a post out. A visible post shrinks the window with it so the
    /// next reveal neither skips nor repeats anything.
    pub fn remove(&mut self, post_id: &PostId) -> bool {
        match self.posts.iter().position(|p| &p.id == post_id) {
            Some(index) => {
                self.posts.remove(index);
                if index < self.reveal_count {
                    self.reveal_count -= 1;
                }
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn posts(n: usize) -> Vec<Post> {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| Post {
                id: (i as u64).into(),
                author_handle: "alice".into(),
                content: format!("post {}", i),
                created_at: base + Duration::minutes(i as i64),
                likes_count: 0,
                comments_count: 0,
                liked_by_current_user: false,
                saved_by_current_user: false,
            })
            .collect()
    }

    #[test]
    fn test_sorted_newest_first() {
        let snap = FeedSnapshot::from_posts(posts(4), 6);
        let ids: Vec<&str> = snap.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "2", "1", "0"]);
        assert_eq!(snap.reveal_count(), 4);
        assert!(!snap.has_more());
    }

    #[test]
    fn test_ties_broken_by_id_descending() {
        let mut all = posts(3);
        let at = all[0].created_at;
        for p in all.iter_mut() {
            p.created_at = at;
        }
        let snap = FeedSnapshot::from_posts(all, 6);
        let ids: Vec<&str> = snap.posts().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1", "0"]);
    }

    #[test]
    fn test_duplicate_ids_dropped() {
        let mut all = posts(3);
        all.push(all[1].clone());
        let snap = FeedSnapshot::from_posts(all, 6);
        assert_eq!(snap.total(), 3);
    }

    #[test]
    fn test_reveal_clamps_to_total() {
        let mut snap = FeedSnapshot::from_posts(posts(14), 6);
        assert_eq!(snap.reveal_next(6), 6);
        assert_eq!(snap.reveal_next(6), 2);
        assert_eq!(snap.reveal_next(6), 0);
        assert_eq!(snap.reveal_count(), 14);
    }

    #[test]
    fn test_remove_visible_post_shrinks_window() {
        let mut snap = FeedSnapshot::from_posts(posts(10), 6);
        let id = snap.visible()[2].id.clone();
        assert!(snap.apply(&PostPatch::Removed { post_id: id.clone() }));
        assert_eq!(snap.reveal_count(), 5);
        assert_eq!(snap.total(), 9);
        assert!(snap.get(&id).is_none());
        assert!(!snap.remove(&id));
    }

    #[test]
    fn test_remove_hidden_post_keeps_window() {
        let mut snap = FeedSnapshot::from_posts(posts(10), 6);
        let id = snap.posts()[8].id.clone();
        assert!(snap.remove(&id));
        assert_eq!(snap.reveal_count(), 6);
        assert!(snap.has_more());
    }
}
