//! # Shelfie API Server Library
//!
//! HTTP surface of Shelfie: account registration and sign-in backed by an
//! external identity provider, plus the product catalogue, reviews and
//! wishlists behind a session cookie.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration from the environment
//! - `error`: Error handling and HTTP response mapping
//! - `middleware`: Security headers and session authentication
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
