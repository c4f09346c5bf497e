//! Plain text section: HTML passed through, markdown converted to HTML.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use pulldown_cmark::{html, Options, Parser};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{options, Process, Section, SectionConfig};
use crate::error::{BulletinError, Result};
use crate::template::DefaultTemplate;

/// How the text of a [`TextSection`] is written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Already HTML; rendered unchanged
    #[default]
    Html,
    /// CommonMark with GitHub extensions
    Markdown,
}

impl Encoding {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Markdown => "markdown",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = BulletinError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "html" => Ok(Self::Html),
            "markdown" => Ok(Self::Markdown),
            other => Err(BulletinError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Convert markdown to an HTML fragment.
#[must_use]
pub fn markdown_to_html(text: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(text, options);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Encoding is read as a raw string so unknown values surface as
/// [`BulletinError::UnsupportedEncoding`] rather than a config error.
#[derive(Debug, Deserialize)]
struct TextOptions {
    text: String,
    #[serde(default = "default_encoding")]
    encoding: String,
}

fn default_encoding() -> String {
    Encoding::Html.as_str().to_string()
}

/// Processor returning the section text as HTML.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextProcessor;

#[async_trait]
impl Process for TextProcessor {
    async fn process(&self, config: &SectionConfig) -> Result<Value> {
        let options: TextOptions = options(config)?;
        let html = match options.encoding.parse::<Encoding>()? {
            Encoding::Html => options.text,
            Encoding::Markdown => markdown_to_html(&options.text),
        };
        Ok(Value::String(html))
    }
}

/// Builder for a plain text section.
#[derive(Debug, Clone)]
pub struct TextSection {
    config: SectionConfig,
}

impl TextSection {
    pub fn new(text: impl Into<String>, encoding: Encoding) -> Self {
        let mut config = SectionConfig::new();
        config.insert("text".to_string(), Value::String(text.into()));
        config.insert(
            "encoding".to_string(),
            Value::String(encoding.as_str().to_string()),
        );
        Self { config }
    }

    #[must_use]
    pub fn into_section(self) -> Section {
        Section::with_default(TextProcessor, self.config, DefaultTemplate::TEXT)
    }
}

impl From<TextSection> for Section {
    fn from(section: TextSection) -> Self {
        section.into_section()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_html_is_identity() {
        let text = "<p>Already <b>HTML</b> & more</p>";
        let section = Section::text(text, Encoding::Html);
        assert_eq!(section.process().await.unwrap(), json!(text));
    }

    #[tokio::test]
    async fn test_markdown_is_converted() {
        let section = Section::text("**x**", Encoding::Markdown);
        let html = section.process().await.unwrap();
        assert_eq!(html, json!("<p><strong>x</strong></p>\n"));
    }

    #[test]
    fn test_markdown_extensions() {
        let html = markdown_to_html("~~gone~~\n\n| a | b |\n|---|---|\n| 1 | 2 |\n");
        assert!(html.contains("<del>gone</del>"));
        assert!(html.contains("<table>"));
    }

    #[tokio::test]
    async fn test_unknown_encoding_fails() {
        let mut section = Section::text("hello", Encoding::Html);
        section
            .config_mut()
            .insert("encoding".to_string(), json!("rtf"));

        let err = section.process().await.unwrap_err();
        match err {
            BulletinError::UnsupportedEncoding(value) => assert_eq!(value, "rtf"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_encoding_round_trips_through_str() {
        for encoding in [Encoding::Html, Encoding::Markdown] {
            assert_eq!(encoding.as_str().parse::<Encoding>().unwrap(), encoding);
        }
    }

    #[tokio::test]
    async fn test_render_bundled_template() {
        let out = Section::text("hello", Encoding::Html).render().await.unwrap();
        assert_eq!(out.trim_end(), r#"<div class="text">hello</div>"#);
    }

    #[test]
    fn test_builder_injects_config() {
        let section = TextSection::new("# Title", Encoding::Markdown).into_section();
        assert_eq!(section.config()["text"], json!("# Title"));
        assert_eq!(section.config()["encoding"], json!("markdown"));
        assert_eq!(section.default_template().name, "plain_text.html");
    }
}
