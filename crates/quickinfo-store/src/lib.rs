mod cache;
mod materialize;
mod rewrite;

pub use cache::{default_cache_dir, ImageCache};
pub use materialize::{materialize, MaterializeReport};
pub use rewrite::{rewrite, rewrite_description};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid cache filename: {0:?}")]
    InvalidName(String),

    #[error("store error: {0}")]
    Internal(String),
}
