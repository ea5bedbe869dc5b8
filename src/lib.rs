// src/lib.rs

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod randomizer;
pub mod routes;
pub mod state;

pub use routes::create_router;
