//! GeckoTerminal trending pools adapter

use serde::Deserialize;
use serde_json::Value;

use meme_core::{SourceId, SourceResult, TokenRecord};

use super::http::HttpFetcher;
use super::number;

const REFERER: &str = "https://www.geckoterminal.com/";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TrendingResponse {
    pub data: Option<Vec<PoolItem>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoolItem {
    pub attributes: Option<PoolAttributes>,
    pub relationships: Option<Relationships>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PoolAttributes {
    pub name: Option<String>,
    pub base_token: Option<BaseToken>,
    pub base_token_price_usd: Option<Value>,
    pub volume_usd: Option<Window>,
    pub reserve_in_usd: Option<Value>,
    pub price_change_percentage: Option<Window>,
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
pub struct Relationships {
    pub base_token: Option<Relation>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Relation {
    pub data: Option<RelationData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RelationData {
    pub id: String,
}

pub fn trending_url(base_url: &str, network: &str) -> String {
    format!(
        "{}/api/v2/networks/{}/trending_pools",
        base_url.trim_end_matches('/'),
        network
    )
}

pub async fn fetch_trending(
    http: &HttpFetcher,
    base_url: &str,
    network: &str,
    observed_at: i64,
) -> SourceResult<Vec<TokenRecord>> {
    let response: TrendingResponse = http
        .get_json(&trending_url(base_url, network), &[], REFERER)
        .await?;
    Ok(normalize(response, observed_at))
}

pub fn normalize(response: TrendingResponse, observed_at: i64) -> Vec<TokenRecord> {
    response
        .data
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| normalize_pool(item, observed_at))
        .collect()
}

/// Map one trending pool onto the canonical record.
///
/// The address comes from `attributes.base_token`, else from the
/// relationship id (`<network>_<address>`). The name falls back to the
/// first half of the pool name (`"BONK / SOL"`); the ticker has no default.
pub fn normalize_pool(item: PoolItem, observed_at: i64) -> Option<TokenRecord> {
    let attrs = item.attributes?;
    let base = attrs.base_token.unwrap_or_default();

    let address = base
        .address
        .filter(|a| !a.trim().is_empty())
        .or_else(|| relationship_address(item.relationships.as_ref()))?;
    let price_usd = number(attrs.base_token_price_usd.as_ref())?;

    let name = base.name.filter(|n| !n.is_empty()).or_else(|| {
        attrs
            .name
            .as_deref()
            .and_then(|n| n.split(" / ").next())
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
    });

    Some(TokenRecord {
        address,
        name,
        ticker: base.symbol.filter(|s| !s.is_empty()),
        price_usd,
        volume_usd: number(attrs.volume_usd.as_ref().and_then(|v| v.h24.as_ref())),
        liquidity_usd: number(attrs.reserve_in_usd.as_ref()),
        price_change_24h: number(attrs.price_change_percentage.as_ref().and_then(|c| c.h24.as_ref())),
        protocol: None,
        source: SourceId::GeckoTerminal,
        last_updated: observed_at,
    })
}

fn relationship_address(relationships: Option<&Relationships>) -> Option<String> {
    let id = &relationships?.base_token.as_ref()?.data.as_ref()?.id;
    let (_, address) = id.split_once('_')?;
    (!address.is_empty()).then(|| address.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Vec<TokenRecord> {
        normalize(serde_json::from_str(json).unwrap(), 42)
    }

    #[test]
    fn test_normalizes_attributes_base_token() {
        let records = parse(
            r#"{"data": [{
                "id": "solana_Pool1",
                "type": "pool",
                "attributes": {
                    "base_token": {"address": "Mint1", "name": "Dogwifhat", "symbol": "WIF"},
                    "base_token_price_usd": "2.31",
                    "volume_usd": {"h24": "9823411.2"},
                    "reserve_in_usd": "1200000",
                    "price_change_percentage": {"h24": "12.5"}
                }
            }]}"#,
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.address, "Mint1");
        assert_eq!(record.name.as_deref(), Some("Dogwifhat"));
        assert_eq!(record.ticker.as_deref(), Some("WIF"));
        assert_eq!(record.price_usd, 2.31);
        assert_eq!(record.volume_usd, Some(9823411.2));
        assert_eq!(record.liquidity_usd, Some(1200000.0));
        assert_eq!(record.price_change_24h, Some(12.5));
        assert_eq!(record.source, SourceId::GeckoTerminal);
    }

    #[test]
    fn test_address_from_relationship() {
        let records = parse(
            r#"{"data": [{
                "attributes": {"name": "BONK / SOL", "base_token_price_usd": "0.00002"},
                "relationships": {"base_token": {"data": {"id": "solana_DezXAZ8z", "type": "token"}}}
            }]}"#,
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "DezXAZ8z");
        assert_eq!(records[0].name.as_deref(), Some("BONK"));
        assert_eq!(records[0].ticker, None);
        assert_eq!(records[0].volume_usd, None);
    }

    #[test]
    fn test_zero_price_is_kept() {
        let records = parse(
            r#"{"data": [{"attributes": {
                "base_token": {"address": "Mint2"},
                "base_token_price_usd": "0"
            }}]}"#,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price_usd, 0.0);
    }

    #[test]
    fn test_drops_pools_without_identity_or_price() {
        let records = parse(
            r#"{"data": [
                {"attributes": {"base_token_price_usd": "1.0"}},
                {"attributes": {"base_token": {"address": "Mint3"}}},
                {"attributes": {"base_token": {"address": "Mint4"}, "base_token_price_usd": null}}
            ]}"#,
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_null_attributes_skip_only_that_pool() {
        let records = parse(
            r#"{"data": [
                {"id": "solana_Broken", "attributes": null},
                {"id": "solana_Bare"},
                {"attributes": {"base_token": {"address": "Mint5"}, "base_token_price_usd": "3.5"}}
            ]}"#,
        );
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].address, "Mint5");
    }

    #[test]
    fn test_missing_data() {
        assert!(parse(r#"{"errors": [{"status": "429"}]}"#).is_empty());
    }
}
