use crate::ingest::records::ReferrerRecord;
use crate::query::aggregate::{aggregate, AggregatedEntry};
use url::Url;

/// Grouping key used for views that arrived without a referrer.
pub const DIRECT_KEY: &str = "(direct)";

/// Group referrers by origin + path, dropping self-referrals.
///
/// Records whose referrer starts with one of `excluded_prefixes` are skipped,
/// as are records without a device count.
pub fn normalize_referrers(
    records: &[ReferrerRecord],
    excluded_prefixes: &[String],
) -> Vec<AggregatedEntry> {
    let pairs = records.iter().filter_map(|record| {
        let referrer = record.referrer.as_deref().unwrap_or("");
        if is_excluded(referrer, excluded_prefixes) {
            return None;
        }
        let count = record.unique_device_count?;
        Some((referrer_key(referrer), count))
    });
    aggregate(pairs)
}

fn is_excluded(referrer: &str, excluded_prefixes: &[String]) -> bool {
    !referrer.is_empty()
        && excluded_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && referrer.starts_with(prefix.as_str()))
}

/// Collapse a referrer URL to `origin + path`, dropping query and fragment.
pub fn referrer_key(referrer: &str) -> String {
    if referrer.is_empty() {
        return DIRECT_KEY.to_string();
    }
    match Url::parse(referrer) {
        Ok(url) => format!("{}{}", url.origin().ascii_serialization(), url.path()),
        Err(_) => referrer
            .split_once('?')
            .map_or(referrer, |(head, _)| head)
            .to_string(),
    }
}
