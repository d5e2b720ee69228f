//! Jupiter price lookup used as a last-resort fallback

use serde_json::Value;

use meme_core::{SourceError, SourceId, SourceResult, TokenRecord, SOL_SYMBOL};

use super::http::HttpFetcher;
use super::number;

const REFERER: &str = "https://jup.ag/";

pub fn price_url(base_url: &str) -> String {
    format!("{}/price/v2", base_url.trim_end_matches('/'))
}

/// Fetch the SOL price and produce a single fallback record
pub async fn fetch_sol_price(
    http: &HttpFetcher,
    base_url: &str,
    mint: &str,
    observed_at: i64,
) -> SourceResult<Vec<TokenRecord>> {
    let body: Value = http.get_json(&price_url(base_url), &[("ids", mint)], REFERER).await?;
    let price = extract_price(&body, mint)
        .ok_or_else(|| SourceError::Malformed(format!("no price for {} in Jupiter response", mint)))?;

    Ok(vec![sol_record(price, observed_at)])
}

/// Reads `data.<mint>.price`, falling back to a symbol-keyed `SOL.price`
pub fn extract_price(body: &Value, mint: &str) -> Option<f64> {
    number(body.pointer(&format!("/data/{}/price", mint)))
        .or_else(|| number(body.pointer(&format!("/{}/price", SOL_SYMBOL))))
}

fn sol_record(price_usd: f64, observed_at: i64) -> TokenRecord {
    TokenRecord {
        address: SOL_SYMBOL.to_string(),
        name: Some(SOL_SYMBOL.to_string()),
        ticker: Some(SOL_SYMBOL.to_string()),
        price_usd,
        volume_usd: None,
        liquidity_usd: None,
        price_change_24h: None,
        protocol: None,
        source: SourceId::JupiterFallback,
        last_updated: observed_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meme_core::WRAPPED_SOL_MINT;

    #[test]
    fn test_extracts_mint_keyed_price() {
        let body: Value = serde_json::from_str(&format!(
            r#"{{"data": {{"{}": {{"id": "{}", "type": "derivedPrice", "price": "148.21"}}}}}}"#,
            WRAPPED_SOL_MINT, WRAPPED_SOL_MINT
        ))
        .unwrap();

        assert_eq!(extract_price(&body, WRAPPED_SOL_MINT), Some(148.21));
    }

    #[test]
    fn test_extracts_symbol_keyed_price() {
        let body: Value = serde_json::from_str(r#"{"SOL": {"price": 150.5}}"#).unwrap();
        assert_eq!(extract_price(&body, WRAPPED_SOL_MINT), Some(150.5));
    }

    #[test]
    fn test_missing_price() {
        let body: Value = serde_json::from_str(r#"{"data": {}}"#).unwrap();
        assert_eq!(extract_price(&body, WRAPPED_SOL_MINT), None);
    }

    #[test]
    fn test_fallback_record_shape() {
        let record = sol_record(150.0, 7);
        assert_eq!(record.address, "SOL");
        assert_eq!(record.source, SourceId::JupiterFallback);
        assert_eq!(record.volume_usd, None);
        assert_eq!(record.last_updated, 7);
    }
}
