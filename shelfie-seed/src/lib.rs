//! # Shelfie Seed
//!
//! Populates a development database with a demo user (backed by a real
//! identity provider account), a brand, a tagged product, a review with a
//! like and a comment, and a wishlist.
//!
//! ## Modules
//!
//! - `config`: environment configuration
//! - `seeder`: the seeding routine

pub mod config;
pub mod seeder;

pub use config::SeedConfig;
pub use seeder::{seed, SeedError, SeedReport};
