//! Google News RSS search, the alternate engine.

use super::NewsSearch;
use crate::error::Result;
use crate::models::SearchHit;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::Client;
use tracing::{debug, instrument};

pub const DEFAULT_BASE_URL: &str = "https://news.google.com";

#[derive(Debug, Clone)]
pub struct GoogleNews {
    client: Client,
    base_url: String,
}

impl GoogleNews {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Map a DuckDuckGo-style region (`id-id`, `us-en`, `wt-wt`) to the
/// `hl`/`gl`/`ceid` triple Google News expects.
fn locale(region: &str) -> (String, String, String) {
    match region.split_once('-') {
        Some((country, lang)) if country != "wt" && !country.is_empty() && !lang.is_empty() => {
            let gl = country.to_uppercase();
            let hl = lang.to_lowercase();
            let ceid = format!("{gl}:{hl}");
            (hl, gl, ceid)
        }
        _ => ("en-US".into(), "US".into(), "US:en".into()),
    }
}

impl NewsSearch for GoogleNews {
    fn name(&self) -> &'static str {
        "google-news"
    }

    #[instrument(level = "info", skip(self), fields(engine = "google-news"))]
    async fn search(&self, query: &str, region: &str, max_results: usize) -> Result<Vec<SearchHit>> {
        let (hl, gl, ceid) = locale(region);
        let xml = self
            .client
            .get(format!("{}/rss/search", self.base_url))
            .query(&[("q", query), ("hl", &hl), ("gl", &gl), ("ceid", &ceid)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let mut hits = parse_rss(&xml)?;
        debug!(count = hits.len(), "Parsed RSS items");
        hits.truncate(max_results);
        Ok(hits)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    Title,
    Link,
    PubDate,
    Description,
    Source,
}

/// Parse the `<item>` elements of an RSS 2.0 document.
pub fn parse_rss(xml: &str) -> Result<Vec<SearchHit>> {
    let mut reader = Reader::from_str(xml);
    let mut hits = Vec::new();
    let mut current: Option<SearchHit> = None;
    let mut field: Option<Field> = None;
    let mut buf = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                match name.as_ref() {
                    b"item" => current = Some(SearchHit::default()),
                    tag if current.is_some() => {
                        field = match tag {
                            b"title" => Some(Field::Title),
                            b"link" => Some(Field::Link),
                            b"pubDate" => Some(Field::PubDate),
                            b"description" => Some(Field::Description),
                            b"source" => Some(Field::Source),
                            _ => None,
                        };
                        buf.clear();
                    }
                    _ => {}
                }
            }
            Event::Text(e) if field.is_some() => buf.push_str(&String::from_utf8_lossy(&e)),
            Event::CData(e) if field.is_some() => buf.push_str(&String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) if field.is_some() => {
                let name = String::from_utf8_lossy(&e).into_owned();
                match e.resolve_char_ref().ok().flatten() {
                    Some(c) => buf.push(c),
                    None => match quick_xml::escape::resolve_predefined_entity(&name) {
                        Some(s) => buf.push_str(s),
                        None => {
                            buf.push('&');
                            buf.push_str(&name);
                            buf.push(';');
                        }
                    },
                }
            }
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == b"item" {
                    if let Some(hit) = current.take() {
                        if !hit.url.is_empty() {
                            hits.push(hit);
                        }
                    }
                } else if let (Some(f), Some(hit)) = (field.take(), current.as_mut()) {
                    let value = buf.trim().to_string();
                    match f {
                        Field::Title => hit.title = value,
                        Field::Link => hit.url = value,
                        Field::PubDate => hit.date = value,
                        Field::Description => hit.body = value,
                        Field::Source => hit.source = value,
                    }
                    buf.clear();
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    for hit in hits.iter_mut() {
        strip_source_suffix(hit);
    }
    Ok(hits)
}

/// Google appends ` - Source` to every title.
fn strip_source_suffix(hit: &mut SearchHit) {
    if hit.source.is_empty() {
        return;
    }
    let suffix = format!(" - {}", hit.source);
    if let Some(stripped) = hit.title.strip_suffix(&suffix) {
        hit.title = stripped.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Search</title>
<item>
  <title>Rupiah strengthens &amp; bonds rally - Example News</title>
  <link>https://news.google.com/articles/abc</link>
  <pubDate>Tue, 06 May 2025 10:00:00 GMT</pubDate>
  <description><![CDATA[<a href="x">Rupiah</a>]]></description>
  <source url="https://example.com">Example News</source>
</item>
<item>
  <title>No link here</title>
</item>
</channel></rss>"#;

    #[test]
    fn parses_items_and_strips_source_suffix() {
        let hits = parse_rss(FEED).unwrap();
        assert_eq!(hits.len(), 1);
        let hit = &hits[0];
        assert_eq!(hit.title, "Rupiah strengthens & bonds rally");
        assert_eq!(hit.url, "https://news.google.com/articles/abc");
        assert_eq!(hit.date, "Tue, 06 May 2025 10:00:00 GMT");
        assert_eq!(hit.source, "Example News");
        assert!(hit.body.contains("Rupiah"));
    }

    #[test]
    fn maps_regions_to_locales() {
        assert_eq!(locale("id-id"), ("id".into(), "ID".into(), "ID:id".into()));
        assert_eq!(locale("wt-wt"), ("en-US".into(), "US".into(), "US:en".into()));
        assert_eq!(locale("bogus"), ("en-US".into(), "US".into(), "US:en".into()));
    }

    #[tokio::test]
    async fn search_hits_rss_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss/search"))
            .and(query_param("q", "rupiah"))
            .and(query_param("gl", "ID"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let engine = GoogleNews::with_base_url(Client::new(), server.uri());
        let hits = engine.search("rupiah", "id-id", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
    }
}
