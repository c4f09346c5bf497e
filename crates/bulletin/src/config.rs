//! Configuration: SMTP credentials from the environment and bulletin
//! descriptions from TOML files.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::bulletin::{Bulletin, BulletinConfig};
use crate::email::EmailServer;
use crate::error::{BulletinError, Result};
use crate::section::feed::DEFAULT_ITEMS;
use crate::section::{Encoding, FeedSection, HttpGetSection, ReturnType, Section, TextSection};

/// Default SMTP port (STARTTLS).
pub const DEFAULT_SMTP_PORT: u16 = 587;

const ENV_SMTP_HOST: &str = "BULLETIN_SMTP_HOST";
const ENV_SMTP_PORT: &str = "BULLETIN_SMTP_PORT";
const ENV_SMTP_USERNAME: &str = "BULLETIN_SMTP_USERNAME";
const ENV_SMTP_PASSWORD: &str = "BULLETIN_SMTP_PASSWORD";

/// SMTP connection settings.
#[derive(Clone)]
pub struct SmtpConfig {
    /// SMTP relay hostname.
    pub host: String,
    /// SMTP relay port.
    pub port: u16,
    /// Login user; also used as the sender address.
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl SmtpConfig {
    /// Create configuration from environment variables.
    ///
    /// # Required Environment Variables
    /// - `BULLETIN_SMTP_HOST`: SMTP relay host
    /// - `BULLETIN_SMTP_USERNAME`: login, also the sender address
    /// - `BULLETIN_SMTP_PASSWORD`: password
    ///
    /// # Optional Environment Variables
    /// - `BULLETIN_SMTP_PORT`: port (default: 587)
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let host = lookup(ENV_SMTP_HOST).ok_or(BulletinError::MissingEnv(ENV_SMTP_HOST))?;
        let username =
            lookup(ENV_SMTP_USERNAME).ok_or(BulletinError::MissingEnv(ENV_SMTP_USERNAME))?;
        let password =
            lookup(ENV_SMTP_PASSWORD).ok_or(BulletinError::MissingEnv(ENV_SMTP_PASSWORD))?;

        let port = match lookup(ENV_SMTP_PORT) {
            Some(value) => value.parse().map_err(|_| {
                BulletinError::InvalidConfig(format!("{ENV_SMTP_PORT} is not a port: '{value}'"))
            })?,
            None => DEFAULT_SMTP_PORT,
        };

        Ok(Self {
            host,
            port,
            username,
            password,
        })
    }
}

/// A bulletin described in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct BulletinFile {
    #[serde(default = "default_subject")]
    pub subject: String,
    pub template: Option<String>,
    pub template_folder: Option<PathBuf>,
    #[serde(default)]
    pub recipients: Vec<String>,
    #[serde(default)]
    pub sections: Vec<SectionSpec>,
}

fn default_subject() -> String {
    BulletinConfig::default().subject
}

const fn default_items() -> usize {
    DEFAULT_ITEMS
}

/// One `[[sections]]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct SectionSpec {
    #[serde(flatten)]
    pub kind: SectionKind,
    pub template: Option<String>,
    pub template_folder: Option<PathBuf>,
}

/// Section variant and its options, tagged by `kind`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SectionKind {
    Feed {
        url: String,
        #[serde(default = "default_items")]
        items: usize,
        #[serde(default)]
        since_last: bool,
    },
    Text {
        text: String,
        #[serde(default)]
        encoding: Encoding,
    },
    HttpGet {
        url: String,
        #[serde(default)]
        headers: BTreeMap<String, String>,
        #[serde(default)]
        params: BTreeMap<String, String>,
        #[serde(default)]
        return_type: ReturnType,
    },
}

impl SectionSpec {
    /// Build the section this table describes.
    #[must_use]
    pub fn to_section(&self) -> Section {
        let mut section = match &self.kind {
            SectionKind::Feed {
                url,
                items,
                since_last,
            } => FeedSection::new(url.as_str())
                .items(*items)
                .since_last(*since_last)
                .into_section(),
            SectionKind::Text { text, encoding } => {
                TextSection::new(text.as_str(), *encoding).into_section()
            }
            SectionKind::HttpGet {
                url,
                headers,
                params,
                return_type,
            } => {
                let mut builder = HttpGetSection::new(url.as_str()).return_type(*return_type);
                for (name, value) in headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                for (name, value) in params {
                    builder = builder.param(name.as_str(), value.as_str());
                }
                builder.into_section()
            }
        };

        if let Some(template) = &self.template {
            section = section.with_template(template.as_str());
        }
        if let Some(folder) = &self.template_folder {
            section = section.with_template_folder(folder.as_path());
        }
        section
    }
}

impl BulletinFile {
    /// Parse a bulletin description.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Read and parse a bulletin description file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Build the bulletin, with sections in file order.
    #[must_use]
    pub fn to_bulletin(&self, email_server: Arc<EmailServer>) -> Bulletin {
        let mut bulletin = Bulletin::new(email_server).with_config(BulletinConfig {
            subject: self.subject.clone(),
        });
        if let Some(template) = &self.template {
            bulletin = bulletin.with_template(template.as_str());
        }
        if let Some(folder) = &self.template_folder {
            bulletin = bulletin.with_template_folder(folder.as_path());
        }

        for spec in &self.sections {
            bulletin.add_section(spec.to_section());
        }
        bulletin
    }
}
