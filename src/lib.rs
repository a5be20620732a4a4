pub mod app_state;
pub mod cache;
pub mod catalog;
pub mod geo;
pub mod nearby;
pub mod routes;
pub mod service;
pub mod tracing;
