//! Translation through the public Google Translate web endpoint.

use crate::config::TextLimits;
use crate::error::{NewsError, Result};
use crate::models::NewsItem;
use crate::utils::truncate_chars;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument, warn};

pub const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";

#[derive(Debug, Clone)]
pub struct Translator {
    client: Client,
    base_url: String,
}

impl Translator {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Translate one chunk of text, detecting the source language.
    pub async fn translate(&self, text: &str, target: &str) -> Result<String> {
        let body: Value = self
            .client
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // [[["translated", "original", ...], ...], ...]
        let sentences = body
            .get(0)
            .and_then(Value::as_array)
            .ok_or_else(|| NewsError::Translation("unexpected response shape".into()))?;
        let translated: String = sentences
            .iter()
            .filter_map(|s| s.get(0).and_then(Value::as_str))
            .collect();
        if translated.is_empty() {
            return Err(NewsError::Translation("empty translation".into()));
        }
        Ok(translated)
    }

    /// Translate paragraph by paragraph.
    ///
    /// Blank lines are kept, each paragraph is cut to
    /// [`TextLimits::TRANSLATION_CHUNK`] characters, and a paragraph that
    /// fails to translate is kept in its original form.
    #[instrument(level = "info", skip(self, text), fields(chars = text.len()))]
    pub async fn translate_text(&self, text: &str, target: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut failures = 0usize;
        for paragraph in text.split('\n') {
            if paragraph.trim().is_empty() {
                out.push(paragraph.to_string());
                continue;
            }
            let chunk = truncate_chars(paragraph, TextLimits::TRANSLATION_CHUNK);
            match self.translate(chunk, target).await {
                Ok(t) => out.push(t),
                Err(e) => {
                    failures += 1;
                    debug!(error = %e, "Keeping untranslated paragraph");
                    out.push(paragraph.to_string());
                }
            }
        }
        if failures > 0 {
            warn!(failures, "Some paragraphs could not be translated");
        }
        out.join("\n")
    }

    /// Translate an item's title and `text` into `target`, storing the
    /// result in the item. The title stays as it was when translation fails.
    pub async fn apply_translation(&self, item: &mut NewsItem, text: &str, target: &str) {
        match self.translate(&item.title, target).await {
            Ok(title) => item.title = title,
            Err(e) => debug!(error = %e, "Keeping original title"),
        }
        item.full_text = self.translate_text(text, target).await;
        item.is_translated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount(server: &MockServer, q: &str, reply: Value) {
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("tl", "id"))
            .and(query_param("q", q))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn joins_translated_sentences() {
        let server = MockServer::start().await;
        mount(
            &server,
            "Rates held. Rupiah up.",
            json!([[["Suku bunga ditahan. ", "Rates held. ", null], ["Rupiah naik.", "Rupiah up.", null]], null, "en"]),
        )
        .await;

        let t = Translator::with_base_url(Client::new(), server.uri());
        assert_eq!(
            t.translate("Rates held. Rupiah up.", "id").await.unwrap(),
            "Suku bunga ditahan. Rupiah naik."
        );
    }

    #[tokio::test]
    async fn failed_paragraphs_keep_original_and_blank_lines_survive() {
        let server = MockServer::start().await;
        mount(&server, "Hello", json!([[["Halo", "Hello"]]])).await;
        Mock::given(method("GET"))
            .and(query_param("q", "Broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let t = Translator::with_base_url(Client::new(), server.uri());
        assert_eq!(t.translate_text("Hello\n\nBroken", "id").await, "Halo\n\nBroken");
    }

    #[tokio::test]
    async fn apply_translation_marks_item() {
        let server = MockServer::start().await;
        mount(&server, "Rates held", json!([[["Suku bunga ditahan", "Rates held"]]])).await;
        mount(&server, "Body", json!([[["Isi", "Body"]]])).await;

        let t = Translator::with_base_url(Client::new(), server.uri());
        let mut item = NewsItem {
            title: "Rates held".into(),
            ..NewsItem::default()
        };
        t.apply_translation(&mut item, "Body", "id").await;
        assert_eq!(item.title, "Suku bunga ditahan");
        assert_eq!(item.full_text, "Isi");
        assert!(item.is_translated);
    }
}
