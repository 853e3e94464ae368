pub mod feed;
pub mod resolver;
pub mod sync;
pub mod walker;
