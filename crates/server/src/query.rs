//! Filtering, sorting and pagination for `/tokens`

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use meme_core::TokenRecord;

pub const DEFAULT_LIMIT: usize = 30;
pub const MAX_LIMIT: usize = 100;

/// Raw query string parameters.
///
/// Everything arrives as text so malformed numbers fall back to defaults
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TokenQuery {
    pub sort: Option<String>,
    pub order: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub min_volume: Option<String>,
    pub min_liquidity: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    PriceUsd,
    VolumeUsd,
    LiquidityUsd,
    PriceChange24h,
    LastUpdated,
}

impl SortField {
    /// Whitelisted field, anything else sorts by volume
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some("price_usd") => SortField::PriceUsd,
            Some("liquidity_usd") => SortField::LiquidityUsd,
            Some("price_change_24h") => SortField::PriceChange24h,
            Some("last_updated") => SortField::LastUpdated,
            _ => SortField::VolumeUsd,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortField::PriceUsd => "price_usd",
            SortField::VolumeUsd => "volume_usd",
            SortField::LiquidityUsd => "liquidity_usd",
            SortField::PriceChange24h => "price_change_24h",
            SortField::LastUpdated => "last_updated",
        }
    }

    fn value(&self, record: &TokenRecord) -> f64 {
        match self {
            SortField::PriceUsd => record.price_usd,
            SortField::VolumeUsd => record.volume_usd.unwrap_or(0.0),
            SortField::LiquidityUsd => record.liquidity_usd.unwrap_or(0.0),
            SortField::PriceChange24h => record.price_change_24h.unwrap_or(0.0),
            SortField::LastUpdated => record.last_updated as f64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
    pub sort_by: String,
    pub sort_order: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPage {
    pub data: Vec<TokenRecord>,
    pub meta: PageMeta,
}

fn parse_f64(value: &Option<String>) -> Option<f64> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}

fn parse_count(value: &Option<String>) -> Option<usize> {
    value.as_deref().and_then(|v| v.trim().parse::<usize>().ok())
}

impl TokenQuery {
    pub fn sort_field(&self) -> SortField {
        SortField::parse(self.sort.as_deref())
    }

    pub fn sort_order(&self) -> SortOrder {
        SortOrder::parse(self.order.as_deref())
    }

    /// Page size: default 30, capped at 100, zero or garbage means default
    pub fn limit(&self) -> usize {
        parse_count(&self.limit)
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    pub fn offset(&self) -> usize {
        parse_count(&self.offset).unwrap_or(0)
    }

    fn matches(&self, record: &TokenRecord) -> bool {
        if let Some(min) = parse_f64(&self.min_price) {
            if record.price_usd < min {
                return false;
            }
        }
        if let Some(max) = parse_f64(&self.max_price) {
            if record.price_usd > max {
                return false;
            }
        }
        if let Some(min) = parse_f64(&self.min_volume) {
            if record.volume_usd.unwrap_or(0.0) < min {
                return false;
            }
        }
        if let Some(min) = parse_f64(&self.min_liquidity) {
            if record.liquidity_usd.unwrap_or(0.0) < min {
                return false;
            }
        }
        match self.search.as_deref().filter(|s| !s.is_empty()) {
            Some(needle) => {
                let needle = needle.to_lowercase();
                let hit = |field: Option<&str>| field.is_some_and(|f| f.to_lowercase().contains(&needle));
                hit(record.name.as_deref()) || hit(record.ticker.as_deref()) || hit(Some(&record.address))
            }
            None => true,
        }
    }

    /// Filter, sort and paginate a snapshot
    pub fn apply(&self, records: &[TokenRecord]) -> TokenPage {
        let field = self.sort_field();
        let order = self.sort_order();
        let limit = self.limit();
        let offset = self.offset();

        let mut tokens: Vec<TokenRecord> = records.iter().filter(|r| self.matches(r)).cloned().collect();

        tokens.sort_by(|a, b| {
            let ord = field
                .value(a)
                .partial_cmp(&field.value(b))
                .unwrap_or(Ordering::Equal);
            match order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });

        let total = tokens.len();
        let data: Vec<TokenRecord> = tokens.into_iter().skip(offset).take(limit).collect();

        TokenPage {
            data,
            meta: PageMeta {
                total,
                limit,
                offset,
                has_more: offset.saturating_add(limit) < total,
                sort_by: field.name().to_string(),
                sort_order: order.name().to_string(),
            },
        }
    }
}
