use std::collections::{HashMap, HashSet};

use tokio::sync::{broadcast, watch, RwLock};

use crate::features::posts::models::Post;

const LIVE_BUFFER: usize = 64;

/// Why the banner is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerKind {
    /// Backend not configured; persists until configuration changes
    Configuration,
    /// A load or submit failed; cleared by the next successful action
    Operation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Configuration,
            message: message.into(),
        }
    }

    pub fn operation(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Operation,
            message: message.into(),
        }
    }
}

/// Position in the stream of live merges, taken before a fetch starts so
/// that [`WallFeed::replace`] keeps what arrived while it ran
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FeedMark(u64);

#[derive(Default)]
struct FeedState {
    /// Newest first
    posts: Vec<Post>,
    banner: Option<Banner>,
    loaded: bool,
    /// Ids already pushed to live viewers
    announced: HashSet<String>,
    /// Bumped on every live merge that adds a post
    seq: u64,
    /// Live-merged ids not yet seen in a fetch, with the seq they arrived at
    merged: HashMap<String, u64>,
}

/// In-memory wall shared by every viewer: the ordered posts, the current
/// banner, and a broadcast of posts as they arrive.
pub struct WallFeed {
    state: RwLock<FeedState>,
    live: broadcast::Sender<Post>,
    closed: watch::Sender<bool>,
}

impl Default for WallFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl WallFeed {
    pub fn new() -> Self {
        let (live, _) = broadcast::channel(LIVE_BUFFER);
        let (closed, _) = watch::channel(false);
        Self {
            state: RwLock::new(FeedState::default()),
            live,
            closed,
        }
    }

    pub async fn mark(&self) -> FeedMark {
        FeedMark(self.state.read().await.seq)
    }

    /// Replace the list with a fresh fetch started at `since`.
    ///
    /// Posts merged live after `since` that the fetch does not contain are
    /// kept; the result is ordered newest first.
    pub async fn replace(&self, posts: Vec<Post>, since: FeedMark) {
        let mut state = self.state.write().await;
        let fetched = dedup_by_id(posts);
        let fetched_ids: HashSet<&str> = fetched.iter().map(|post| post.id.as_str()).collect();

        let mut kept: Vec<Post> = state
            .posts
            .iter()
            .filter(|post| !fetched_ids.contains(post.id.as_str()))
            .filter(|post| matches!(state.merged.get(&post.id), Some(seq) if *seq > since.0))
            .cloned()
            .collect();

        state.merged.retain(|id, _| !fetched_ids.contains(id.as_str()));

        if kept.is_empty() {
            state.posts = fetched;
        } else {
            kept.extend(fetched);
            kept.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            state.posts = kept;
        }
        state.loaded = true;
    }

    /// Drop every post, e.g. after a failed fetch
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        state.posts.clear();
        state.merged.clear();
        state.loaded = true;
    }

    /// Merge a post that just came into existence: put it at the front
    /// unless a post with the same id is present, and push it to live
    /// viewers at most once per id.
    ///
    /// Returns whether the list changed.
    pub async fn merge_live(&self, post: Post) -> bool {
        let mut state = self.state.write().await;

        let added = if state.posts.iter().any(|existing| existing.id == post.id) {
            false
        } else {
            state.posts.insert(0, post.clone());
            state.seq += 1;
            let seq = state.seq;
            state.merged.insert(post.id.clone(), seq);
            true
        };

        if state.announced.insert(post.id.clone()) {
            // No receivers is fine: nobody is watching right now
            let _ = self.live.send(post);
        }

        added
    }

    pub async fn set_banner(&self, banner: Banner) {
        self.state.write().await.banner = Some(banner);
    }

    pub async fn clear_banner(&self) {
        self.state.write().await.banner = None;
    }

    pub async fn banner(&self) -> Option<Banner> {
        self.state.read().await.banner.clone()
    }

    #[cfg(test)]
    pub async fn posts(&self) -> Vec<Post> {
        self.state.read().await.posts.clone()
    }

    /// Whether a load has completed, successfully or not
    pub async fn is_loaded(&self) -> bool {
        self.state.read().await.loaded
    }

    pub async fn snapshot(&self) -> (Vec<Post>, Option<Banner>) {
        let state = self.state.read().await;
        (state.posts.clone(), state.banner.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Post> {
        self.live.subscribe()
    }

    /// Tell live viewers the wall is going away
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    /// Resolves once [`WallFeed::close`] has been called
    pub fn closed(&self) -> impl std::future::Future<Output = ()> + Send + 'static {
        let mut receiver = self.closed.subscribe();
        async move {
            loop {
                let done = *receiver.borrow_and_update();
                if done || receiver.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}

fn dedup_by_id(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| seen.insert(post.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::test_helpers::{sample_post, test_epoch};
    use chrono::Duration;

    #[tokio::test]
    async fn test_merge_live_puts_new_post_first() {
        let feed = WallFeed::new();
        feed.replace(vec![sample_post("1", "old", test_epoch())], feed.mark().await)
            .await;

        assert!(
            feed.merge_live(sample_post("2", "new", test_epoch() + Duration::minutes(1)))
                .await
        );

        let ids: Vec<_> = feed.posts().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_merge_live_ignores_known_id() {
        let feed = WallFeed::new();
        feed.replace(vec![sample_post("1", "old", test_epoch())], feed.mark().await)
            .await;

        assert!(!feed.merge_live(sample_post("1", "old", test_epoch())).await);
        assert_eq!(feed.posts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_replace_drops_duplicate_ids() {
        let feed = WallFeed::new();
        feed.replace(
            vec![
                sample_post("1", "a", test_epoch()),
                sample_post("1", "a", test_epoch()),
                sample_post("2", "b", test_epoch()),
            ],
            feed.mark().await,
        )
        .await;
        assert_eq!(feed.posts().await.len(), 2);
        assert!(feed.is_loaded().await);
    }

    #[tokio::test]
    async fn test_merge_live_announces_once() {
        let feed = WallFeed::new();
        let mut live = feed.subscribe();
        let post = sample_post("9", "hi", test_epoch());

        assert!(feed.merge_live(post.clone()).await);
        assert!(!feed.merge_live(post.clone()).await);

        assert_eq!(live.recv().await.unwrap().id, "9");
        assert!(live.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_merge_live_announces_post_already_fetched() {
        let feed = WallFeed::new();
        let mut live = feed.subscribe();
        let post = sample_post("3", "fetched first", test_epoch());
        feed.replace(vec![post.clone()], feed.mark().await).await;

        assert!(!feed.merge_live(post).await);
        assert_eq!(live.recv().await.unwrap().id, "3");
        assert_eq!(feed.posts().await.len(), 1);
    }

    #[tokio::test]
    async fn test_banner_lifecycle() {
        let feed = WallFeed::new();
        assert_eq!(feed.banner().await, None);

        feed.set_banner(Banner::operation("Failed to load posts: boom"))
            .await;
        assert_eq!(feed.banner().await.unwrap().kind, BannerKind::Operation);

        feed.clear_banner().await;
        assert_eq!(feed.banner().await, None);
    }

    #[tokio::test]
    async fn test_closed_resolves_after_close() {
        let feed = WallFeed::new();
        let closed = feed.closed();
        feed.close();
        tokio::time::timeout(std::time::Duration::from_secs(1), closed)
            .await
            .unwrap();

        // Late waiters see the flag immediately
        tokio::time::timeout(std::time::Duration::from_secs(1), feed.closed())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_empties_list() {
        let feed = WallFeed::new();
        feed.replace(vec![sample_post("1", "a", test_epoch())], feed.mark().await)
            .await;
        feed.reset().await;
        assert!(feed.posts().await.is_empty());
    }

    #[tokio::test]
    async fn test_replace_keeps_post_merged_during_fetch() {
        let feed = WallFeed::new();
        let mark = feed.mark().await;
        // The fetch snapshot was taken before this insert landed
        let fetched = vec![sample_post("1", "old", test_epoch())];
        feed.merge_live(sample_post("2", "live", test_epoch() + Duration::minutes(1)))
            .await;

        feed.replace(fetched, mark).await;

        let ids: Vec<_> = feed.posts().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_replace_drops_post_merged_before_mark() {
        let feed = WallFeed::new();
        feed.merge_live(sample_post("2", "live", test_epoch())).await;
        let mark = feed.mark().await;

        // Merged before the fetch began and missing from it: the fetch wins
        feed.replace(vec![sample_post("1", "old", test_epoch())], mark)
            .await;

        let ids: Vec<_> = feed.posts().await.into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[tokio::test]
    async fn test_replace_prefers_fetched_copy_of_merged_post() {
        let feed = WallFeed::new();
        let mark = feed.mark().await;
        feed.merge_live(sample_post("2", "live", test_epoch())).await;

        feed.replace(
            vec![
                sample_post("2", "live", test_epoch()),
                sample_post("1", "old", test_epoch() - Duration::minutes(1)),
            ],
            mark,
        )
        .await;

        assert_eq!(feed.posts().await.len(), 2);
        // Once fetched, a later refresh no longer carries it over
        feed.replace(vec![], feed.mark().await).await;
        assert!(feed.posts().await.is_empty());
    }
}
