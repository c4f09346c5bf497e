//! HTTP GET section.

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{options, Process, Section, SectionConfig};
use crate::error::{BulletinError, Result};
use crate::template::DefaultTemplate;

/// How the response body is handed to the template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReturnType {
    /// Parsed JSON structure
    #[default]
    Json,
    /// Decoded body text
    Text,
}

#[derive(Debug, Deserialize)]
struct HttpGetOptions {
    url: String,
    #[serde(default, deserialize_with = "scalar_map")]
    headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "scalar_map")]
    params: BTreeMap<String, String>,
    #[serde(default)]
    return_type: ReturnType,
}

/// Map of names to strings, numbers or booleans; non-string values are stringified.
fn scalar_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, Value>::deserialize(deserializer)?
        .into_iter()
        .map(|(name, value)| match value {
            Value::String(s) => Ok((name, s)),
            Value::Number(n) => Ok((name, n.to_string())),
            Value::Bool(b) => Ok((name, b.to_string())),
            other => Err(de::Error::custom(format!(
                "value for `{name}` must be a string, number or boolean, got {other}"
            ))),
        })
        .collect()
}

/// Processor performing a single GET request.
#[derive(Debug, Clone, Default)]
pub struct HttpGetProcessor {
    client: reqwest::Client,
}

impl HttpGetProcessor {
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Process for HttpGetProcessor {
    async fn process(&self, config: &SectionConfig) -> Result<Value> {
        let options: HttpGetOptions = options(config)?;

        let mut request = self.client.get(&options.url).query(&options.params);
        for (name, value) in &options.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(url = %options.url, status = status.as_u16(), "HTTP GET completed");

        if status != StatusCode::OK {
            return Err(BulletinError::RequestFailed {
                url: options.url,
                status: status.as_u16(),
            });
        }

        match options.return_type {
            ReturnType::Json => Ok(response.json::<Value>().await?),
            ReturnType::Text => Ok(Value::String(response.text().await?)),
        }
    }
}

/// Builder for an HTTP GET section.
#[derive(Debug, Clone)]
pub struct HttpGetSection {
    config: SectionConfig,
    processor: HttpGetProcessor,
}

impl HttpGetSection {
    pub fn new(url: impl Into<String>) -> Self {
        let mut config = SectionConfig::new();
        config.insert("url".to_string(), Value::String(url.into()));
        config.insert("headers".to_string(), Value::Object(SectionConfig::new()));
        config.insert("params".to_string(), Value::Object(SectionConfig::new()));
        config.insert(
            "return_type".to_string(),
            Value::String("json".to_string()),
        );
        Self {
            config,
            processor: HttpGetProcessor::default(),
        }
    }

    /// Add a request header.
    #[must_use]
    pub fn header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_into("headers", name.into(), value.into())
    }

    /// Add a query parameter.
    #[must_use]
    pub fn param(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_into("params", name.into(), value.into())
    }

    #[must_use]
    pub fn return_type(mut self, return_type: ReturnType) -> Self {
        let value = match return_type {
            ReturnType::Json => "json",
            ReturnType::Text => "text",
        };
        self.config
            .insert("return_type".to_string(), Value::String(value.to_string()));
        self
    }

    /// Use a preconfigured HTTP client.
    #[must_use]
    pub fn client(mut self, client: reqwest::Client) -> Self {
        self.processor = HttpGetProcessor::with_client(client);
        self
    }

    fn insert_into(mut self, key: &str, name: String, value: String) -> Self {
        let map = self
            .config
            .entry(key)
            .or_insert_with(|| Value::Object(SectionConfig::new()));
        if let Value::Object(map) = map {
            map.insert(name, Value::String(value));
        }
        self
    }

    #[must_use]
    pub fn into_section(self) -> Section {
        Section::with_default(self.processor, self.config, DefaultTemplate::HTTP_GET)
    }
}

impl From<HttpGetSection> for Section {
    fn from(section: HttpGetSection) -> Self {
        section.into_section()
    }
}
