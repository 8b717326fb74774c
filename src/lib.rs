pub mod api;
pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod routes;
pub mod routing;
pub mod session;
pub mod state;
pub mod views;
