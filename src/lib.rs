pub mod auth;
pub mod config;
pub mod db;
pub mod documents;
pub mod error;
pub mod ids;
pub mod intake;
pub mod maintenance;
pub mod models;
pub mod organizations;
pub mod routes;
pub mod schema;
pub mod state;
pub mod storage;
pub mod tagging;
