pub mod app;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod record;
pub mod services;

pub use app::app;

#[cfg(test)]
pub mod testing;
