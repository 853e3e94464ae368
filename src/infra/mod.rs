pub mod ani;
pub mod feed;
pub mod retry;
pub mod store;

#[cfg(test)]
pub mod fake;
