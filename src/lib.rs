pub mod api;
pub mod auth;
pub mod backend;
pub mod calendar;
pub mod config;
pub mod docs;
pub mod error;
pub mod model;
pub mod models;
pub mod routes;
pub mod session;
pub mod utils;
pub mod vocabulary;
