pub mod config;
pub mod error;
pub mod feed;
pub mod models;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use feed::{FeedController, FeedError, LoadOutcome, ScrollObserver};
pub use store::AppState;
