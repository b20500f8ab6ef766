//! Recency filtering and near-duplicate removal for search hits.

use crate::config::TextLimits;
use crate::models::{NewsItem, SearchHit};
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone};
use std::collections::HashSet;
use tracing::{debug, info, instrument};

/// Normalize a title for comparison.
pub fn clean_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Ratcliff/Obershelp similarity of two strings, in `[0.0, 1.0]`.
///
/// `2 * M / T` where `M` is the number of characters in matching blocks and
/// `T` the total length of both strings. Blocks are found by repeatedly
/// taking the longest common substring (earliest in `a`, then earliest in
/// `b`) and recursing on the pieces to its left and right.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        matched += k;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, len)`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
    // prev[j + 1] = length of the run ending at a[i - 1], b[j]
    let mut prev = vec![0usize; bhi - blo + 1];
    for i in alo..ahi {
        let mut cur = vec![0usize; bhi - blo + 1];
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = prev[j - blo] + 1;
                cur[j - blo + 1] = k;
                if k > best_k {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_k = k;
                }
            }
        }
        prev = cur;
    }
    (best_i, best_j, best_k)
}

/// Whether a title is already present, exactly or above `threshold`
/// similarity, in the set of cleaned titles seen so far.
pub fn is_duplicate(title: &str, seen: &HashSet<String>, threshold: f64) -> bool {
    let title = clean_title(title);
    if seen.contains(&title) {
        return true;
    }
    seen.iter()
        .any(|existing| similarity_ratio(&title, existing) > threshold)
}

/// Parse the date formats search engines hand back.
///
/// Dates without an offset are taken to be in the local time zone.
pub fn parse_date(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt);
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%z"] {
        if let Ok(dt) = DateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

/// Keep hits published within the last `days` days, drop near-duplicate
/// titles (first occurrence wins), and sort newest first.
///
/// Hits without a parseable date are dropped.
#[instrument(level = "info", skip_all, fields(input = hits.len(), days = days))]
pub fn filter_recent_news(hits: Vec<SearchHit>, days: i64) -> Vec<NewsItem> {
    filter_recent_news_at(hits, days, Local::now().fixed_offset())
}

pub(crate) fn filter_recent_news_at(
    hits: Vec<SearchHit>,
    days: i64,
    now: DateTime<FixedOffset>,
) -> Vec<NewsItem> {
    let cutoff = now - Duration::days(days);
    let mut seen: HashSet<String> = HashSet::new();
    let mut recent: Vec<NewsItem> = Vec::new();

    for hit in hits {
        let Some(published) = parse_date(&hit.date) else {
            debug!(url = %hit.url, date = %hit.date, "Dropping hit without a usable date");
            continue;
        };
        if published < cutoff {
            continue;
        }
        if is_duplicate(&hit.title, &seen, TextLimits::DUPLICATE_THRESHOLD) {
            debug!(title = %hit.title, "Dropping duplicate title");
            continue;
        }
        seen.insert(clean_title(&hit.title));

        let mut item = NewsItem::from(hit);
        item.formatted_date = published.format("%Y-%m-%d %H:%M:%S").to_string();
        item.published_at = Some(published);
        recent.push(item);
    }

    recent.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    info!(kept = recent.len(), "Filtered recent news");
    recent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, date: &str, url: &str) -> SearchHit {
        SearchHit {
            date: date.to_string(),
            title: title.to_string(),
            url: url.to_string(),
            ..SearchHit::default()
        }
    }

    #[test]
    fn ratio_matches_difflib_examples() {
        assert_eq!(similarity_ratio("abcd", "bcde"), 0.75);
        assert_eq!(similarity_ratio("", ""), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert_eq!(similarity_ratio("same", "same"), 1.0);
    }

    #[test]
    fn near_identical_titles_are_duplicates() {
        let mut seen = HashSet::new();
        seen.insert(clean_title("Bank Indonesia holds rate at 6 percent"));
        assert!(is_duplicate("Bank Indonesia holds rate at 6 percent.", &seen, 0.85));
        assert!(is_duplicate("  BANK INDONESIA HOLDS RATE AT 6 PERCENT ", &seen, 0.85));
        assert!(!is_duplicate("Rupiah weakens against the dollar", &seen, 0.85));
    }

    #[test]
    fn parses_common_formats() {
        assert!(parse_date("2025-05-06T10:00:00+00:00").is_some());
        assert!(parse_date("Tue, 06 May 2025 10:00:00 GMT").is_some());
        assert!(parse_date("2025-05-06 10:00:00").is_some());
        assert!(parse_date("2025-05-06").is_some());
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn filter_keeps_recent_sorted_and_unique() {
        let now = DateTime::parse_from_rfc3339("2025-05-06T12:00:00+00:00").unwrap();
        let hits = vec![
            hit("Older story", "2025-05-05T08:00:00+00:00", "https://a/1"),
            hit("Newest story", "2025-05-06T11:00:00+00:00", "https://a/2"),
            hit("Newest story!", "2025-05-06T10:00:00+00:00", "https://a/3"),
            hit("Ancient story", "2025-04-01T08:00:00+00:00", "https://a/4"),
            hit("No date", "", "https://a/5"),
        ];

        let items = filter_recent_news_at(hits, 2, now);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest story", "Older story"]);
        assert_eq!(items[0].formatted_date, "2025-05-06 11:00:00");
        assert!(items[0].published_at.is_some());
    }

    #[test]
    fn filter_on_empty_input() {
        assert!(filter_recent_news(Vec::new(), 3).is_empty());
    }
}
