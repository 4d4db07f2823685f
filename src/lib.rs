//! Client library for the surf forecast and recommendation API.
//!
//! The backend scores conditions; this crate authenticates, fetches, caches
//! and prepares the results for display.

pub mod commands;
pub mod config;
pub mod errors;
pub mod helpers;
pub mod models;
pub mod services;
pub mod storage;
