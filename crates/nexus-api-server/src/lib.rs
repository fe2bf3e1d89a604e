pub mod auth;
pub mod cache;
pub mod config;
pub mod database;
pub mod handlers;
pub mod models;
pub mod security;
pub mod services;
pub mod utils;

#[cfg(test)]
mod test;
