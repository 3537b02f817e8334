//! Infinite-scroll feed pagination
//!
//! [`FeedController`] owns the item list and the set of catalog ids already
//! served, [`ScrollObserver`] turns scroll position into load-more calls, and
//! [`watch_filters`] reloads the feed when the applied filters change.

pub mod controller;
pub mod scroll;
pub mod watch;

pub use controller::{FeedController, FeedError, FeedResult, FeedSnapshot, LoadOutcome, SkipReason};
pub use scroll::{remaining_after, ScrollObserver};
pub use watch::watch_filters;
