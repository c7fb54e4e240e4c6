pub mod app;
pub mod auth;
pub mod board;
pub mod config;
pub mod errors;
pub mod logging;
pub mod server;
pub mod store;
pub mod ui;
