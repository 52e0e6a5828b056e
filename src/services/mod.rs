pub mod hasher;
pub mod shortener;

pub use hasher::{UrlHasher, XxHasher};
pub use shortener::ShortenerService;
