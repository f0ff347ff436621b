/// API route handlers, one module per resource
///
/// - `health`: liveness and database check
/// - `auth`: register, login, OAuth callback, logout
/// - `profile`: the signed-in user's profile and the profile directory
/// - `catalog`: brands and products
/// - `reviews`: reviews, likes and comments
/// - `wishlist`: the signed-in user's wishlist

pub mod auth;
pub mod catalog;
pub mod health;
pub mod profile;
pub mod reviews;
pub mod wishlist;

use serde::Deserialize;

/// Largest page a list endpoint returns
pub const MAX_PAGE_SIZE: i64 = 100;
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// `?limit=&offset=` query parameters
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    /// Clamped `(limit, offset)`
    pub fn resolve(&self) -> (i64, i64) {
        let limit = self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_defaults_and_clamps() {
        assert_eq!(Pagination::default().resolve(), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(
            Pagination { limit: Some(1000), offset: Some(-5) }.resolve(),
            (MAX_PAGE_SIZE, 0)
        );
        assert_eq!(Pagination { limit: Some(0), offset: Some(40) }.resolve(), (1, 40));
    }
}
