//! Merge engine - one record per identity, highest volume wins

use std::collections::HashMap;

use meme_core::TokenRecord;

/// Reduce multi-source records to one record per case-insensitive identity.
///
/// The first record seen for an identity is the provisional winner; a later
/// record replaces it only when its volume (absent = 0) is strictly greater.
/// Output follows first-seen order of each identity.
pub fn merge_records<I>(records: I) -> Vec<TokenRecord>
where
    I: IntoIterator<Item = TokenRecord>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<TokenRecord> = Vec::new();

    for record in records {
        let key = record.identity();
        if key.is_empty() {
            continue;
        }

        match index.get(&key) {
            Some(&slot) => {
                if record.volume_or_zero() > merged[slot].volume_or_zero() {
                    merged[slot] = record;
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(record);
            }
        }
    }

    merged
}
