mod page_renderer;
mod realtime_bridge;
mod wall_feed;
mod wall_service;

pub use page_renderer::PageRenderer;
pub use realtime_bridge::{RealtimeBridge, TeardownReport};
pub use wall_feed::{Banner, BannerKind, FeedMark, WallFeed};
pub use wall_service::{PostForm, WallService};
