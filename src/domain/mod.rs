pub mod models;
pub mod season;
