//! Diff engine - classifies merged records against the previous projection

use meme_core::{ChangeEvent, FeedEvent, PriceChange, TokenRecord};

use crate::state::PriceProjection;

/// New and materially changed tokens for one cycle.
///
/// Tokens that disappeared since the previous cycle are not reported here;
/// compare snapshot membership to observe removals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diff {
    pub new_tokens: Vec<TokenRecord>,
    pub price_changes: Vec<PriceChange>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.new_tokens.is_empty() && self.price_changes.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = ChangeEvent> + '_ {
        self.new_tokens
            .iter()
            .cloned()
            .map(ChangeEvent::NewToken)
            .chain(self.price_changes.iter().cloned().map(ChangeEvent::PriceChange))
    }

    /// Broadcast batches, skipping empty ones
    pub fn into_feed_events(self) -> Vec<FeedEvent> {
        let mut events = Vec::with_capacity(2);
        if !self.new_tokens.is_empty() {
            events.push(FeedEvent::NewTokens(self.new_tokens));
        }
        if !self.price_changes.is_empty() {
            events.push(FeedEvent::PriceChanges(self.price_changes));
        }
        events
    }
}

/// `|new - old| / old`, or `None` when there is nothing comparable
pub fn change_fraction(old_price: f64, new_price: f64) -> Option<f64> {
    if !old_price.is_finite() || !new_price.is_finite() || old_price == 0.0 {
        return None;
    }
    let fraction = ((new_price - old_price) / old_price).abs();
    fraction.is_finite().then_some(fraction)
}

/// Compare the current merged set with the previous cycle's projection
pub fn compute_diff(current: &[TokenRecord], previous: &PriceProjection, threshold: f64) -> Diff {
    let mut diff = Diff::default();

    for record in current {
        match previous.price_of(&record.address) {
            None => diff.new_tokens.push(record.clone()),
            Some(old_price) => {
                if let Some(fraction) = change_fraction(old_price, record.price_usd) {
                    if fraction >= threshold {
                        diff.price_changes.push(PriceChange {
                            token: record.clone(),
                            price_change_pct: fraction,
                        });
                    }
                }
            }
        }
    }

    diff
}
