//! Yahoo Finance provider for equity quotes.
//!
//! Uses the public chart endpoint (`/v8/finance/chart/{symbol}`), which needs
//! no crumb or cookie and carries the latest price and previous close in its
//! `meta` block.

mod models;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use urlencoding::encode;

use super::to_decimal;
use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::EquityQuote;

use models::{YahooChartMeta, YahooChartResponse};

const DEFAULT_CURRENCY: &str = "USD";

pub struct YahooProvider {
    upstream: Upstream,
}

impl YahooProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    /// Latest quote for a single symbol.
    pub async fn equity_quote(&self, symbol: &str) -> Result<EquityQuote, FeedError> {
        debug!("Fetching latest quote for {} from Yahoo", symbol);
        let request = self
            .upstream
            .request(&format!("/v8/finance/chart/{}", encode(symbol)))
            .query("interval", "1d")
            .query("range", "1d");

        let response: YahooChartResponse = self.upstream.get_json(request).await?;
        let meta = first_meta(response, self.upstream.id())?;
        map_equity_quote(symbol, meta, self.upstream.id())
    }

    /// Quotes for every symbol, in input order.
    ///
    /// A failing symbol is skipped; the call only fails when none succeed.
    pub async fn stock_quotes(&self, symbols: &[String]) -> Result<Vec<EquityQuote>, FeedError> {
        let mut quotes = Vec::with_capacity(symbols.len());
        let mut last_error = None;

        for symbol in symbols {
            match self.equity_quote(symbol).await {
                Ok(quote) => quotes.push(quote),
                Err(e) => {
                    warn!(provider = self.upstream.id(), "Skipping {}: {}", symbol, e);
                    last_error = Some(e);
                }
            }
        }

        match (quotes.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok(quotes),
        }
    }
}

fn first_meta(response: YahooChartResponse, provider: &str) -> Result<YahooChartMeta, FeedError> {
    if let Some(error) = response.chart.error {
        return Err(FeedError::decode(
            provider,
            format!(
                "{}: {}",
                error.code.unwrap_or_default(),
                error.description.unwrap_or_default()
            ),
        ));
    }

    response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .map(|r| r.meta)
        .ok_or_else(|| FeedError::missing_field(provider, "chart.result[0]"))
}

fn map_equity_quote(
    symbol: &str,
    meta: YahooChartMeta,
    provider: &str,
) -> Result<EquityQuote, FeedError> {
    let price = meta
        .regular_market_price
        .ok_or_else(|| FeedError::missing_field(provider, "meta.regularMarketPrice"))?;
    let previous_close = meta
        .previous_close
        .or(meta.chart_previous_close)
        .unwrap_or(price);

    let price = to_decimal(provider, "regularMarketPrice", price)?;
    let previous_close = to_decimal(provider, "previousClose", previous_close)?;
    let change = price - previous_close;
    let change_pct = if previous_close.is_zero() {
        0.0
    } else {
        (change / previous_close * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or_default()
    };

    Ok(EquityQuote {
        symbol: meta.symbol.unwrap_or_else(|| symbol.to_string()),
        price,
        previous_close,
        change,
        change_pct,
        currency: meta
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
    })
}
