//! GeckoTerminal provider for trending DEX pools.

use std::collections::HashMap;

use serde::Deserialize;

use super::upstream::Upstream;
use crate::errors::FeedError;
use crate::models::defaults::{DEX_NUMERIC_DEFAULT, DEX_TRANSACTIONS_DEFAULT};
use crate::models::DexPool;

/// Pools kept from the trending list.
pub const DEX_TRENDING_LIMIT: usize = 10;

/// JSON:API envelope from /networks/trending_pools
#[derive(Debug, Deserialize)]
struct TrendingPoolsResponse {
    #[serde(default)]
    data: Vec<PoolResource>,
    #[serde(default)]
    included: Vec<IncludedResource>,
}

#[derive(Debug, Deserialize)]
struct PoolResource {
    attributes: PoolAttributes,
    #[serde(default)]
    relationships: PoolRelationships,
}

/// Numbers arrive as strings.
#[derive(Debug, Deserialize)]
struct PoolAttributes {
    name: Option<String>,
    base_token_price_usd: Option<String>,
    reserve_in_usd: Option<String>,
    #[serde(default)]
    volume_usd: HashMap<String, Option<String>>,
    #[serde(default)]
    price_change_percentage: HashMap<String, Option<String>>,
    #[serde(default)]
    transactions: HashMap<String, TransactionCounts>,
}

#[derive(Debug, Default, Deserialize)]
struct TransactionCounts {
    #[serde(default)]
    buys: u64,
    #[serde(default)]
    sells: u64,
}

#[derive(Debug, Default, Deserialize)]
struct PoolRelationships {
    network: Option<Relationship>,
    dex: Option<Relationship>,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    data: Option<ResourceRef>,
}

#[derive(Debug, Deserialize)]
struct ResourceRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IncludedResource {
    id: String,
    #[serde(default)]
    attributes: IncludedAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct IncludedAttributes {
    name: Option<String>,
}

pub struct GeckoTerminalProvider {
    upstream: Upstream,
}

impl GeckoTerminalProvider {
    pub fn new(upstream: Upstream) -> Self {
        Self { upstream }
    }

    pub async fn dex_trending(&self) -> Result<Vec<DexPool>, FeedError> {
        let request = self
            .upstream
            .request("/networks/trending_pools")
            .query("include", "dex,network");
        let response: TrendingPoolsResponse = self.upstream.get_json(request).await?;
        Ok(map_trending_pools(response))
    }
}

fn parse_number(value: Option<&String>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .unwrap_or(DEX_NUMERIC_DEFAULT)
}

fn map_trending_pools(response: TrendingPoolsResponse) -> Vec<DexPool> {
    let names: HashMap<&str, &str> = response
        .included
        .iter()
        .filter_map(|r| r.attributes.name.as_deref().map(|n| (r.id.as_str(), n)))
        .collect();

    // Fall back to the relationship id (e.g. "solana") when not included.
    let resolve = |rel: &Option<Relationship>| -> String {
        rel.as_ref()
            .and_then(|r| r.data.as_ref())
            .map(|d| {
                names
                    .get(d.id.as_str())
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| d.id.clone())
            })
            .unwrap_or_default()
    };

    response
        .data
        .iter()
        .take(DEX_TRENDING_LIMIT)
        .map(|pool| {
            let attrs = &pool.attributes;
            let transactions_24h = attrs
                .transactions
                .get("h24")
                .map(|t| t.buys + t.sells)
                .unwrap_or(DEX_TRANSACTIONS_DEFAULT);
            DexPool {
                name: attrs.name.clone().unwrap_or_default(),
                network: resolve(&pool.relationships.network),
                dex: resolve(&pool.relationships.dex),
                base_token_price_usd: parse_number(attrs.base_token_price_usd.as_ref()),
                volume_24h_usd: parse_number(attrs.volume_usd.get("h24").and_then(Option::as_ref)),
                price_change_24h_pct: parse_number(
                    attrs
                        .price_change_percentage
                        .get("h24")
                        .and_then(Option::as_ref),
                ),
                liquidity_usd: parse_number(attrs.reserve_in_usd.as_ref()),
                transactions_24h,
            }
        })
        .collect()
}
