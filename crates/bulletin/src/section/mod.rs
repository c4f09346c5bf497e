//! Sections: independently processed and rendered units of bulletin content.
//!
//! A [`Section`] pairs a [`Process`] implementation with the configuration it
//! consumes and a [`TemplateChoice`]. Rendering runs the processor and renders
//! the resulting value as the template variable `data`.
//!
//! Variants supply a processor, their configuration keys and a bundled default
//! template:
//!
//! - [`FeedSection`]: summary of an RSS/Atom feed
//! - [`TextSection`]: HTML or markdown text
//! - [`HttpGetSection`]: result of an HTTP GET request

pub mod feed;
pub mod http;
pub mod text;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{BulletinError, Result};
use crate::template::{DefaultTemplate, TemplateChoice};

pub use feed::{FeedItem, FeedSection, FeedSummary};
pub use http::{HttpGetSection, ReturnType};
pub use text::{markdown_to_html, Encoding, TextSection};

/// Named parameters consumed by a section's processor.
pub type SectionConfig = serde_json::Map<String, Value>;

/// Produces the data a section's template renders.
#[async_trait]
pub trait Process: Send + Sync {
    /// Turn the section configuration into template data.
    async fn process(&self, config: &SectionConfig) -> Result<Value>;
}

/// Adapter for plain functions and closures.
struct FnProcess<F>(F);

#[async_trait]
impl<F> Process for FnProcess<F>
where
    F: Fn(&SectionConfig) -> Result<Value> + Send + Sync,
{
    async fn process(&self, config: &SectionConfig) -> Result<Value> {
        (self.0)(config)
    }
}

/// Template context for a section render.
#[derive(Serialize)]
struct SectionContext<'a> {
    data: &'a Value,
}

/// One unit of bulletin content.
///
/// Cloning a section shares its processor but copies its configuration.
#[derive(Clone)]
pub struct Section {
    processor: Arc<dyn Process>,
    config: SectionConfig,
    template: TemplateChoice,
}

impl Section {
    /// Create a section rendered with the generic `section.html` template.
    pub fn new(processor: impl Process + 'static, config: SectionConfig) -> Self {
        Self::with_default(processor, config, DefaultTemplate::SECTION)
    }

    /// Create a section from a function of its configuration.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&SectionConfig) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(FnProcess(f), SectionConfig::new())
    }

    /// Create a section with a specific bundled default template.
    pub fn with_default(
        processor: impl Process + 'static,
        config: SectionConfig,
        default: DefaultTemplate,
    ) -> Self {
        Self {
            processor: Arc::new(processor),
            config,
            template: TemplateChoice::new(default),
        }
    }

    /// Feed summary section with default options.
    pub fn feed(url: impl Into<String>) -> Self {
        FeedSection::new(url).into()
    }

    /// Plain text section.
    pub fn text(text: impl Into<String>, encoding: Encoding) -> Self {
        TextSection::new(text, encoding).into()
    }

    /// HTTP GET section with default options.
    pub fn http_get(url: impl Into<String>) -> Self {
        HttpGetSection::new(url).into()
    }

    /// Render with the named template instead of the default.
    #[must_use]
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template.set_template(Some(template.into()));
        self
    }

    /// Folder the template override is loaded from.
    #[must_use]
    pub fn with_template_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.template.set_folder(folder);
        self
    }

    /// Replace the configuration.
    #[must_use]
    pub fn with_config(mut self, config: SectionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &SectionConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut SectionConfig {
        &mut self.config
    }

    #[must_use]
    pub fn template(&self) -> &TemplateChoice {
        &self.template
    }

    #[must_use]
    pub fn template_folder(&self) -> &Path {
        self.template.folder()
    }

    #[must_use]
    pub const fn default_template(&self) -> DefaultTemplate {
        self.template.default_template()
    }

    /// Run the processor against this section's configuration.
    pub async fn process(&self) -> Result<Value> {
        self.processor.process(&self.config).await
    }

    /// Process and render this section.
    pub async fn render(&self) -> Result<String> {
        let data = self.process().await?;
        debug!(
            template = self.template.template().unwrap_or(self.default_template().name),
            "Rendering section"
        );
        self.template.render(&SectionContext { data: &data })
    }
}

impl fmt::Debug for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Section")
            .field("config", &self.config)
            .field("template", &self.template)
            .finish_non_exhaustive()
    }
}

/// Deserialize a processor's typed options from its configuration.
pub(crate) fn options<T: DeserializeOwned>(config: &SectionConfig) -> Result<T> {
    serde_json::from_value(Value::Object(config.clone()))
        .map_err(|e| BulletinError::InvalidConfig(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::DEFAULT_TEMPLATE_FOLDER;
    use serde_json::json;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    #[allow(clippy::unnecessary_wraps)]
    fn test_process(_: &SectionConfig) -> Result<Value> {
        Ok(json!({"test": "test"}))
    }

    #[test]
    fn test_section_defaults() {
        let section = Section::from_fn(test_process);
        assert!(section.config().is_empty());
        assert!(section.template().template().is_none());
        assert_eq!(section.template_folder(), Path::new(DEFAULT_TEMPLATE_FOLDER));
        assert_eq!(section.default_template().name, "section.html");
    }

    #[tokio::test]
    async fn test_section_process() {
        let section = Section::from_fn(test_process);
        assert_eq!(section.process().await.unwrap(), json!({"test": "test"}));
    }

    #[tokio::test]
    async fn test_process_receives_config() {
        let mut config = SectionConfig::new();
        config.insert("name".to_string(), json!("bulletin"));
        let section = Section::from_fn(|config| Ok(config["name"].clone())).with_config(config);
        assert_eq!(section.process().await.unwrap(), json!("bulletin"));
    }

    #[tokio::test]
    async fn test_render_default_template() {
        let section = Section::from_fn(test_process);
        let out = section.render().await.unwrap();
        assert!(out.starts_with("<section>"));
        assert!(out.contains("&quot;test&quot;"));
    }

    #[tokio::test]
    async fn test_render_folder_without_template_uses_default() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("section.html"), "overridden").unwrap();

        let section = Section::from_fn(test_process).with_template_folder(dir.path());
        let out = section.render().await.unwrap();
        assert_ne!(out, "overridden");
        assert!(out.starts_with("<section>"));
    }

    #[tokio::test]
    async fn test_render_template_and_folder_override() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("custom.html"), "custom: {{data.test}}").unwrap();

        let section = Section::from_fn(test_process)
            .with_template("custom.html")
            .with_template_folder(dir.path());
        assert_eq!(section.render().await.unwrap(), "custom: test");
    }

    #[tokio::test]
    async fn test_render_template_override_uses_default_folder() {
        // Tests run from the crate root, where the bundled templates live
        let section = Section::from_fn(|_| Ok(json!("<em>hi</em>"))).with_template("plain_text.html");
        let out = section.render().await.unwrap();
        assert_eq!(out.trim_end(), r#"<div class="text"><em>hi</em></div>"#);
    }

    #[tokio::test]
    async fn test_render_reruns_process() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let section = Section::from_fn(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(json!(null))
        });

        section.render().await.unwrap();
        section.render().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_process_error_propagates() {
        let section = Section::from_fn(|_| Err(BulletinError::Process("boom".to_string())));
        let err = section.render().await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_cloned_sections_have_independent_config() {
        let original = Section::from_fn(test_process);
        let mut copy = original.clone();
        copy.config_mut().insert("key".to_string(), json!(1));
        assert!(original.config().is_empty());
        assert_eq!(copy.config().len(), 1);
    }

    #[test]
    fn test_options_reports_invalid_config() {
        #[derive(serde::Deserialize)]
        struct Needs {
            #[allow(dead_code)]
            url: String,
        }
        let err = options::<Needs>(&SectionConfig::new()).err().unwrap();
        assert!(matches!(err, BulletinError::InvalidConfig(_)));
    }
}
