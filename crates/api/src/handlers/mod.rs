pub mod admin;
pub mod credits;
pub mod generations;
pub mod images;
pub mod models;
