use crate::shortcuts::normalize;
use crate::types::Usage;
use std::collections::HashMap;

/// Order keys by usage count, then recency, then case-insensitive name.
/// `usage` is keyed by normalized phrase; unrecorded keys count as zero.
pub fn ranked_keys(keys: &[String], usage: &HashMap<String, Usage>) -> Vec<String> {
    let mut ranked = keys.to_vec();
    ranked.sort_by_cached_key(|key| {
        let u = usage.get(&normalize(key)).copied().unwrap_or_default();
        (
            std::cmp::Reverse(u.count),
            std::cmp::Reverse(u.last_used),
            key.to_lowercase(),
        )
    });
    ranked
}
