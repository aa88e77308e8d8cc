//! Upstream providers and the client that composes them into datasets.
//!
//! Every provider goes through a shared [`upstream::Upstream`], which waits
//! on the rate limiter and then calls the resilient fetcher. Providers only
//! build requests and map responses into normalized records.

mod client;
mod traits;

pub mod alternative_me;
pub mod blockchain;
pub mod coingecko;
pub mod fred;
pub mod geckoterminal;
pub mod mempool;
pub mod opensea;
pub mod upstream;
pub mod yahoo;

use rust_decimal::Decimal;

use crate::errors::FeedError;

// Re-exports
pub use client::MarketClient;
pub use traits::DatasetSource;

#[cfg(test)]
pub(crate) use client::testing as client_testing;

/// Convert an upstream float into a `Decimal` price.
pub(crate) fn to_decimal(provider: &str, field: &str, value: f64) -> Result<Decimal, FeedError> {
    Decimal::try_from(value)
        .map(|d| d.normalize())
        .map_err(|e| FeedError::decode(provider, format!("{}: {}", field, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_to_decimal() {
        assert_eq!(to_decimal("X", "price", 64250.5).unwrap(), dec!(64250.5));
        assert!(to_decimal("X", "price", f64::NAN).is_err());
        assert!(to_decimal("X", "price", f64::INFINITY).is_err());
    }
}
