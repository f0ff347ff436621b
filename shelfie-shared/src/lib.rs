//! # Shelfie Shared Library
//!
//! Types, storage and business logic shared by the Shelfie API server and
//! the seed tool.
//!
//! ## Module Organization
//!
//! - `identity`: identity provider trait, GoTrue client and in-memory mock
//! - `auth`: password hashing, session cookies, local user store
//! - `saga`: ordered steps with reverse compensation
//! - `provisioning`: account provisioning across provider and database
//! - `db`: connection pool and migrations
//! - `models`: database models

pub mod auth;
pub mod db;
pub mod identity;
pub mod models;
pub mod provisioning;
pub mod saga;

/// Current version of the Shelfie shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
