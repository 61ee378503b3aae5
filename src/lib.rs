pub mod app_error;
pub mod app_state;
pub mod bootstrap;
pub mod config;
pub mod db;
pub mod extract;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod swagger;
