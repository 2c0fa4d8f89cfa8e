pub mod auth;
pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod utils;
