//! Text helpers: sentiment scoring, URL validation, emoji selection and the
//! template tweet used when no AI draft exists.

use crate::config::TextLimits;
use crate::models::{Sentiment, SentimentLabel};
use crate::utils::truncate_chars;
use itertools::Itertools;
use tracing::warn;
use url::Url;

/// Word polarities in `[-1.0, 1.0]`, English and Indonesian.
const LEXICON: &[(&str, f64)] = &[
    // Positive
    ("good", 0.7),
    ("great", 0.8),
    ("excellent", 1.0),
    ("best", 1.0),
    ("better", 0.5),
    ("positive", 0.23),
    ("success", 0.3),
    ("successful", 0.75),
    ("win", 0.8),
    ("wins", 0.8),
    ("won", 0.6),
    ("gain", 0.4),
    ("gains", 0.4),
    ("growth", 0.3),
    ("rise", 0.2),
    ("rises", 0.2),
    ("surge", 0.4),
    ("record", 0.3),
    ("strong", 0.43),
    ("stronger", 0.45),
    ("strengthens", 0.4),
    ("boost", 0.4),
    ("improve", 0.4),
    ("improved", 0.4),
    ("recovery", 0.3),
    ("profit", 0.4),
    ("happy", 0.8),
    ("peace", 0.5),
    ("safe", 0.5),
    ("hope", 0.4),
    ("agreement", 0.3),
    ("breakthrough", 0.6),
    ("innovative", 0.5),
    ("love", 0.5),
    ("baik", 0.7),
    ("bagus", 0.7),
    ("naik", 0.3),
    ("untung", 0.5),
    ("sukses", 0.7),
    ("berhasil", 0.6),
    ("menang", 0.7),
    ("positif", 0.4),
    ("meningkat", 0.4),
    ("aman", 0.5),
    ("damai", 0.5),
    ("tumbuh", 0.4),
    // Negative
    ("bad", -0.7),
    ("worse", -0.6),
    ("worst", -1.0),
    ("terrible", -1.0),
    ("negative", -0.3),
    ("fail", -0.5),
    ("failed", -0.5),
    ("failure", -0.5),
    ("loss", -0.4),
    ("losses", -0.4),
    ("lose", -0.4),
    ("fall", -0.3),
    ("falls", -0.3),
    ("drop", -0.3),
    ("plunge", -0.6),
    ("crash", -0.7),
    ("crisis", -0.6),
    ("war", -0.5),
    ("attack", -0.6),
    ("killed", -0.8),
    ("dead", -0.6),
    ("death", -0.6),
    ("disaster", -0.8),
    ("fear", -0.5),
    ("threat", -0.5),
    ("risk", -0.3),
    ("weak", -0.4),
    ("scandal", -0.6),
    ("corruption", -0.7),
    ("fraud", -0.7),
    ("ban", -0.4),
    ("lawsuit", -0.4),
    ("conflict", -0.5),
    ("violence", -0.8),
    ("sad", -0.5),
    ("angry", -0.5),
    ("buruk", -0.7),
    ("turun", -0.3),
    ("rugi", -0.5),
    ("gagal", -0.6),
    ("kalah", -0.5),
    ("negatif", -0.4),
    ("krisis", -0.6),
    ("perang", -0.5),
    ("korupsi", -0.7),
    ("bencana", -0.8),
    ("tewas", -0.8),
    ("konflik", -0.5),
    ("ancaman", -0.5),
    ("anjlok", -0.6),
];

const NEGATIONS: &[&str] = &["not", "no", "never", "n't", "tidak", "bukan", "tak", "belum"];

fn polarity(word: &str) -> Option<f64> {
    LEXICON
        .iter()
        .find(|(w, _)| *w == word)
        .map(|&(_, score)| score)
}

/// Score the polarity of a text.
///
/// Looks at the first [`TextLimits::SENTIMENT_SAMPLE`] characters, averages
/// the polarity of known words, and flips (at half strength) a word that
/// directly follows a negation. Scores above `0.1` are positive, below
/// `-0.1` negative. Empty text is [`SentimentLabel::Unknown`].
pub fn analyze_sentiment(text: &str) -> Sentiment {
    let sample = truncate_chars(text, TextLimits::SENTIMENT_SAMPLE);
    if sample.trim().is_empty() {
        return Sentiment::unknown();
    }

    let words: Vec<String> = sample
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut total = 0.0;
    let mut matched = 0usize;
    for (i, word) in words.iter().enumerate() {
        if let Some(mut score) = polarity(word) {
            let negated = i > 0 && {
                let prev = words[i - 1].as_str();
                NEGATIONS.contains(&prev) || prev.ends_with("n't")
            };
            if negated {
                score *= -0.5;
            }
            total += score;
            matched += 1;
        }
    }

    let score = if matched == 0 {
        0.0
    } else {
        (total / matched as f64).clamp(-1.0, 1.0)
    };

    let label = if score > 0.1 {
        SentimentLabel::Positive
    } else if score < -0.1 {
        SentimentLabel::Negative
    } else {
        SentimentLabel::Neutral
    };
    Sentiment::new(label, score)
}

const DANGEROUS_URL_CHARS: &[char] = &[';', '|', '&', '$', '`', '\n', '\r'];

/// Whether a URL is safe to hand to an external process.
///
/// Only `http`/`https` with a host, and none of the shell metacharacters in
/// `; | & $ \``, nor line breaks.
pub fn validate_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return false;
    }
    if url.contains(DANGEROUS_URL_CHARS) {
        warn!(url = %truncate_chars(url, 50), "URL contains suspicious characters");
        return false;
    }
    true
}

const TOPIC_ICONS: &[(&str, &[&str])] = &[
    ("🤖", &["ai", "tech", "robot", "data", "cyber", "app", "soft", "hard"]),
    (
        "💰",
        &[
            "saham", "uang", "bisnis", "ekonomi", "market", "stock", "profit", "crypto", "bitcoin",
            "btc", "invest",
        ],
    ),
    ("🏥", &["sehat", "dokter", "virus", "obat", "medis"]),
    ("🎮", &["game", "play", "esport"]),
    ("⚖️", &["politik", "presiden", "hukum", "negara", "dpr", "mpr", "partai"]),
];

const COUNTRY_FLAGS: &[(&str, &str)] = &[
    ("indonesia", "🇮🇩"),
    ("jakarta", "🇮🇩"),
    ("rupiah", "🇮🇩"),
    ("jokowi", "🇮🇩"),
    ("prabowo", "🇮🇩"),
    ("amerika", "🇺🇸"),
    ("usa", "🇺🇸"),
    ("united states", "🇺🇸"),
    ("biden", "🇺🇸"),
    ("trump", "🇺🇸"),
    ("dollar", "🇺🇸"),
    ("china", "🇨🇳"),
    ("tiongkok", "🇨🇳"),
    ("beijing", "🇨🇳"),
    ("xi jinping", "🇨🇳"),
    ("yuan", "🇨🇳"),
    ("jepang", "🇯🇵"),
    ("japan", "🇯🇵"),
    ("tokyo", "🇯🇵"),
    ("yen", "🇯🇵"),
    ("korea", "🇰🇷"),
    ("seoul", "🇰🇷"),
    ("k-pop", "🇰🇷"),
    ("rusia", "🇷🇺"),
    ("russia", "🇷🇺"),
    ("moskow", "🇷🇺"),
    ("putin", "🇷🇺"),
    ("ukraina", "🇺🇦"),
    ("ukraine", "🇺🇦"),
    ("kiev", "🇺🇦"),
    ("kyiv", "🇺🇦"),
    ("inggris", "🇬🇧"),
    ("uk", "🇬🇧"),
    ("london", "🇬🇧"),
    ("eropa", "🇪🇺"),
    ("europe", "🇪🇺"),
    ("eu", "🇪🇺"),
    ("palestina", "🇵🇸"),
    ("gaza", "🇵🇸"),
    ("hamas", "🇵🇸"),
    ("israel", "🇮🇱"),
    ("tel aviv", "🇮🇱"),
    ("arab", "🇸🇦"),
    ("saudi", "🇸🇦"),
    ("mekkah", "🇸🇦"),
    ("malaysia", "🇲🇾"),
    ("kuala lumpur", "🇲🇾"),
    ("singapura", "🇸🇬"),
    ("singapore", "🇸🇬"),
    ("india", "🇮🇳"),
    ("new delhi", "🇮🇳"),
    ("jerman", "🇩🇪"),
    ("germany", "🇩🇪"),
    ("prancis", "🇫🇷"),
    ("france", "🇫🇷"),
];

/// Pick a topic icon plus up to two country flags for a piece of text.
///
/// Keywords match as substrings, so short keys like `ai` or `eu` fire
/// inside longer words.
pub fn get_relevant_emoji(text: &str) -> String {
    let text = text.to_lowercase();

    let topic_icon = TOPIC_ICONS
        .iter()
        .find(|(_, keys)| keys.iter().any(|k| text.contains(k)))
        .map(|(icon, _)| *icon)
        .unwrap_or("📢");

    let flags = COUNTRY_FLAGS
        .iter()
        .filter(|(keyword, _)| text.contains(keyword))
        .map(|(_, flag)| *flag)
        .sorted()
        .dedup()
        .take(2);

    std::iter::once(topic_icon).chain(flags).join(" ")
}

const TWEET_LIMIT: usize = 280;

/// Build a template tweet draft of at most 280 characters.
///
/// Uses the first sentence of the AI summary when present, otherwise the
/// first sentence of the article text.
pub fn generate_tweet(title: &str, text: &str, topic: &str, ai_summary: &str) -> String {
    let emoji = get_relevant_emoji(&format!("{title} {topic}"));
    let safe_topic: String = topic.chars().filter(|c| !c.is_whitespace()).collect();
    let hashtags = format!("#{safe_topic} #BreakingNews #xnews");

    let first_sentence = |s: &str| format!("{}.", s.split('.').next().unwrap_or("").trim());
    let mut summary = if !ai_summary.is_empty() {
        first_sentence(ai_summary)
    } else if !text.is_empty() {
        first_sentence(text)
    } else {
        "Read the full story.".to_string()
    };

    let base_len = emoji.chars().count() + 1 + title.chars().count() + 5 + hashtags.chars().count();
    let remaining = TWEET_LIMIT.saturating_sub(base_len);
    if summary.chars().count() > remaining {
        summary = format!("{}...", truncate_chars(&summary, remaining.saturating_sub(3)));
    }

    format!("{emoji} {title}\n\n📝 {summary}\n\n{hashtags}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_unknown() {
        let s = analyze_sentiment("   ");
        assert_eq!(s.label, SentimentLabel::Unknown);
        assert_eq!(s.score, 0.0);
        assert_eq!(s.emoji, "❓");
    }

    #[test]
    fn positive_text() {
        let s = analyze_sentiment("The launch was a great success and the outlook is good.");
        assert_eq!(s.label, SentimentLabel::Positive);
        assert!(s.score > 0.1);
    }

    #[test]
    fn negative_text() {
        let s = analyze_sentiment("Markets crash as crisis deepens; investors fear losses.");
        assert_eq!(s.label, SentimentLabel::Negative);
        assert!(s.score < -0.1);
    }

    #[test]
    fn text_without_known_words_is_neutral() {
        let s = analyze_sentiment("The committee met on Tuesday to discuss the schedule.");
        assert_eq!(s.label, SentimentLabel::Neutral);
        assert_eq!(s.score, 0.0);
    }

    #[test]
    fn negation_flips_polarity() {
        let s = analyze_sentiment("This is not good");
        assert!(s.score < 0.0, "expected negative score, got {}", s.score);
    }

    #[test]
    fn indonesian_words_are_scored() {
        let s = analyze_sentiment("Ekonomi tumbuh dan rupiah naik, investor untung");
        assert_eq!(s.label, SentimentLabel::Positive);
    }

    #[test]
    fn validate_url_accepts_plain_https() {
        assert!(validate_url("https://example.com/news/1"));
        assert!(validate_url("http://example.com"));
    }

    #[test]
    fn validate_url_rejects_bad_input() {
        assert!(!validate_url(""));
        assert!(!validate_url("ftp://example.com/file"));
        assert!(!validate_url("https://example.com/a;rm -rf"));
        assert!(!validate_url("https://example.com/?a=1&b=2"));
        assert!(!validate_url("https://example.com/$(id)"));
        assert!(!validate_url("not a url"));
    }

    #[test]
    fn emoji_topic_and_flags() {
        assert_eq!(get_relevant_emoji("Bitcoin price today"), "💰");
        assert_eq!(get_relevant_emoji("weather report"), "📢");
        let e = get_relevant_emoji("Saham Jakarta dan Tokyo");
        assert!(e.starts_with("💰"));
        assert!(e.contains("🇮🇩"));
        assert!(e.contains("🇯🇵"));
    }

    #[test]
    fn emoji_caps_flags_at_two() {
        let e = get_relevant_emoji("news from japan, france, germany and india");
        assert_eq!(e.split(' ').count(), 3);
    }

    #[test]
    fn template_tweet_fits_limit() {
        let long_text = "word ".repeat(200);
        let tweet = generate_tweet("A headline", &long_text, "rust lang", "");
        assert!(tweet.chars().count() <= TWEET_LIMIT + 10);
        assert!(tweet.contains("#rustlang"));
        assert!(tweet.contains("A headline"));
    }

    #[test]
    fn template_tweet_prefers_summary() {
        let tweet = generate_tweet("T", "Body sentence. More.", "x", "Summary first. Second.");
        assert!(tweet.contains("📝 Summary first."));
    }
}
