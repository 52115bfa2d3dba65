pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod memory;
pub mod projects;
pub mod state;
