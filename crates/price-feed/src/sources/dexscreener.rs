//! DexScreener search adapter

use serde::Deserialize;
use serde_json::Value;

use meme_core::{SourceId, SourceResult, TokenRecord};

use super::http::HttpFetcher;
use super::{non_zero, number};

const REFERER: &str = "https://dexscreener.com/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    pub pairs: Option<Vec<Pair>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Pair {
    pub dex_id: Option<String>,
    pub base_token: Option<BaseToken>,
    pub token_address: Option<String>,
    pub price_usd: Option<Value>,
    pub volume: Option<Window>,
    pub volume_usd: Option<Value>,
    pub liquidity: Option<Liquidity>,
    pub price_change: Option<Window>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BaseToken {
    pub address: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Window {
    pub h24: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Liquidity {
    pub usd: Option<Value>,
}

pub fn search_url(base_url: &str) -> String {
    format!("{}/latest/dex/search", base_url.trim_end_matches('/'))
}

pub async fn fetch_search(
    http: &HttpFetcher,
    base_url: &str,
    query: &str,
    observed_at: i64,
) -> SourceResult<Vec<TokenRecord>> {
    let response: SearchResponse = http
        .get_json(&search_url(base_url), &[("q", query)], REFERER)
        .await?;
    Ok(normalize(response, observed_at))
}

pub fn normalize(response: SearchResponse, observed_at: i64) -> Vec<TokenRecord> {
    response
        .pairs
        .unwrap_or_default()
        .into_iter()
        .filter_map(|pair| normalize_pair(pair, observed_at))
        .collect()
}

/// Map one pair onto the canonical record.
///
/// Defaults: name `"Unknown"`, ticker `""`. Zero or unparsable numbers are
/// absent; a pair whose price is absent is dropped.
pub fn normalize_pair(pair: Pair, observed_at: i64) -> Option<TokenRecord> {
    let base = pair.base_token.unwrap_or_default();

    let address = base
        .address
        .filter(|a| !a.trim().is_empty())
        .or(pair.token_address.filter(|a| !a.trim().is_empty()))?;
    let price_usd = non_zero(number(pair.price_usd.as_ref()))?;

    let volume_usd = non_zero(number(pair.volume.as_ref().and_then(|v| v.h24.as_ref())))
        .or_else(|| non_zero(number(pair.volume_usd.as_ref())));
    let liquidity_usd = non_zero(number(pair.liquidity.as_ref().and_then(|l| l.usd.as_ref())));
    let price_change_24h = number(pair.price_change.as_ref().and_then(|c| c.h24.as_ref()));

    Some(TokenRecord {
        address,
        name: Some(base.name.filter(|n| !n.is_empty()).unwrap_or_else(|| "Unknown".to_string())),
        ticker: Some(base.symbol.unwrap_or_default()),
        price_usd,
        volume_usd,
        liquidity_usd,
        price_change_24h,
        protocol: pair.dex_id.filter(|d| !d.is_empty()),
        source: SourceId::DexScreener,
        last_updated: observed_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<TokenRecord> {
        normalize(serde_json::from_str(json).unwrap(), 1_700_000_000_000)
    }

    #[test]
    fn test_normalizes_pair() {
        let records = parse(
            r#"{"pairs": [{
                "dexId": "raydium",
                "baseToken": {"address": "Mint1", "name": "Bonk", "symbol": "BONK"},
                "priceUsd": "0.0000231",
                "volume": {"h24": 1523000.5},
                "liquidity": {"usd": 88000},
                "priceChange": {"h24": -4.2}
            }]}"#,
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.address, "Mint1");
        assert_eq!(record.ticker.as_deref(), Some("BONK"));
        assert!((record.price_usd - 0.0000231).abs() < 1e-12);
        assert_eq!(record.volume_usd, Some(1523000.5));
        assert_eq!(record.liquidity_usd, Some(88000.0));
        assert_eq!(record.price_change_24h, Some(-4.2));
        assert_eq!(record.protocol.as_deref(), Some("raydium"));
        assert_eq!(record.source, SourceId::DexScreener);
        assert_eq!(record.last_updated, 1_700_000_000_000);
    }

    #[test]
    fn test_defaults_and_fallbacks() {
        let records = parse(
            r#"{"pairs": [{
                "tokenAddress": "Mint2",
                "priceUsd": 1.5,
                "volumeUsd": "200"
            }]}"#,
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "Mint2");
        assert_eq!(records[0].name.as_deref(), Some("Unknown"));
        assert_eq!(records[0].ticker.as_deref(), Some(""));
        assert_eq!(records[0].volume_usd, Some(200.0));
        assert_eq!(records[0].liquidity_usd, None);
    }

    #[test]
    fn test_drops_pairs_without_identity_or_price() {
        let records = parse(
            r#"{"pairs": [
                {"baseToken": {"name": "NoAddress"}, "priceUsd": "1"},
                {"baseToken": {"address": "Mint3"}},
                {"baseToken": {"address": "Mint4"}, "priceUsd": "abc"},
                {"baseToken": {"address": "Mint5"}, "priceUsd": "0"},
                {"baseToken": {"address": "Mint6"}, "priceUsd": "2"}
            ]}"#,
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "Mint6");
    }

    #[test]
    fn test_null_pairs() {
        assert!(parse(r#"{"schemaVersion": "1.0.0", "pairs": null}"#).is_empty());
        assert!(parse(r#"{}"#).is_empty());
    }

    #[test]
    fn test_search_url() {
        assert_eq!(
            search_url("https://api.dexscreener.com/"),
            "https://api.dexscreener.com/latest/dex/search"
        );
    }
}
