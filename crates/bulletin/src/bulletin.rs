//! Bulletins: ordered sections rendered into one document and sent by email.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::email::{EmailServer, Recipients};
use crate::error::Result;
use crate::section::Section;
use crate::template::{DefaultTemplate, TemplateChoice};

/// Default email subject.
pub const DEFAULT_SUBJECT: &str = "Bulletin";

/// Bulletin-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletinConfig {
    /// Subject used when `send` is not given one.
    pub subject: String,
}

impl Default for BulletinConfig {
    fn default() -> Self {
        Self {
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

/// Template context for a bulletin render.
#[derive(Serialize)]
struct BulletinContext<'a> {
    content: &'a [String],
}

/// One outgoing document built from sections.
pub struct Bulletin {
    email_server: Arc<EmailServer>,
    config: BulletinConfig,
    sections: Vec<Section>,
    template: TemplateChoice,
}

impl Bulletin {
    /// Create an empty bulletin sending through `email_server`.
    #[must_use]
    pub fn new(email_server: Arc<EmailServer>) -> Self {
        Self {
            email_server,
            config: BulletinConfig::default(),
            sections: Vec::new(),
            template: TemplateChoice::new(DefaultTemplate::BASE),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: BulletinConfig) -> Self {
        self.config = config;
        self
    }

    /// Render with the named template instead of `base.html`.
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

    /// Append a section and return all sections in display order.
    pub fn add_section(&mut self, section: Section) -> &[Section] {
        self.sections.push(section);
        &self.sections
    }

    #[must_use]
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    #[must_use]
    pub const fn config(&self) -> &BulletinConfig {
        &self.config
    }

    #[must_use]
    pub const fn template(&self) -> &TemplateChoice {
        &self.template
    }

    #[must_use]
    pub fn email_server(&self) -> &Arc<EmailServer> {
        &self.email_server
    }

    /// Render every section in order, then the bulletin template with them as `content`.
    ///
    /// Sections are processed one after another; the first failure aborts the render.
    pub async fn render(&self) -> Result<String> {
        let mut content = Vec::with_capacity(self.sections.len());
        for (index, section) in self.sections.iter().enumerate() {
            debug!(index, "Rendering bulletin section");
            content.push(section.render().await?);
        }

        self.template.render(&BulletinContext { content: &content })
    }

    /// Render and email the bulletin.
    ///
    /// Uses `subject` when given, otherwise the configured subject.
    pub async fn send(
        &self,
        recipients: impl Into<Recipients>,
        subject: Option<&str>,
    ) -> Result<()> {
        let recipients = recipients.into();
        let body = self.render().await?;
        let subject = subject.unwrap_or(&self.config.subject);

        info!(
            sections = self.sections.len(),
            subject, "Sending bulletin"
        );
        self.email_server.send(&recipients, subject, &body).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BulletinError;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn server() -> Arc<EmailServer> {
        Arc::new(EmailServer::disabled())
    }

    #[test]
    fn test_bulletin_defaults() {
        let bulletin = Bulletin::new(server());
        assert_eq!(bulletin.config().subject, "Bulletin");
        assert!(bulletin.sections().is_empty());
        assert!(bulletin.template().template().is_none());
        assert_eq!(bulletin.template().default_template().name, "base.html");
    }

    #[test]
    fn test_add_section_returns_all_sections() {
        let mut bulletin = Bulletin::new(server());
        let first = bulletin.add_section(Section::from_fn(|_| Ok(json!(1)))).len();
        assert_eq!(first, 1);

        let sections = bulletin.add_section(Section::from_fn(|_| Ok(json!(2))));
        assert_eq!(sections.len(), 2);
    }

    #[test]
    fn test_duplicate_sections_are_kept() {
        let mut bulletin = Bulletin::new(server());
        let section = Section::from_fn(|_| Ok(json!("x")));
        bulletin.add_section(section.clone());
        bulletin.add_section(section);
        assert_eq!(bulletin.sections().len(), 2);
    }

    #[tokio::test]
    async fn test_render_default_template() {
        let mut bulletin = Bulletin::new(server());
        bulletin.add_section(Section::from_fn(|_| Ok(json!({"test": "test"}))));

        let out = bulletin.render().await.unwrap();
        assert!(out.starts_with("<!DOCTYPE html>"));
        assert!(out.contains("<div class=\"section\">"));
        assert!(out.contains("&quot;test&quot;"));
    }

    #[tokio::test]
    async fn test_render_custom_template_in_order() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("list.html"),
            "{{#each content}}[{{{this}}}]{{/each}}",
        )
        .unwrap();
        fs::write(dir.path().join("item.html"), "{{data}}").unwrap();

        let mut bulletin = Bulletin::new(server())
            .with_template("list.html")
            .with_template_folder(dir.path());
        for n in 1..=3 {
            bulletin.add_section(
                Section::from_fn(move |_| Ok(json!(n)))
                    .with_template("item.html")
                    .with_template_folder(dir.path()),
            );
        }

        assert_eq!(bulletin.render().await.unwrap(), "[1][2][3]");
    }

    #[tokio::test]
    async fn test_failing_section_fails_render() {
        let mut bulletin = Bulletin::new(server());
        bulletin.add_section(Section::from_fn(|_| Ok(json!("ok"))));
        bulletin.add_section(Section::from_fn(|_| {
            Err(BulletinError::Process("section failed".to_string()))
        }));

        let err = bulletin.render().await.unwrap_err();
        assert!(matches!(err, BulletinError::Process(_)));
    }

    #[tokio::test]
    async fn test_missing_bulletin_template_fails() {
        let dir = TempDir::new().unwrap();
        let bulletin = Bulletin::new(server())
            .with_template("nope.html")
            .with_template_folder(dir.path());
        assert!(matches!(
            bulletin.render().await,
            Err(BulletinError::TemplateNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_with_disabled_server_fails() {
        let bulletin = Bulletin::new(server());
        let err = bulletin.send("a@example.com", None).await.unwrap_err();
        assert!(matches!(err, BulletinError::TransportDisabled));
    }
}
