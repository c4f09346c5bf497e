//! Template resolution and rendering using Handlebars.
//!
//! Every [`Section`](crate::Section) and [`Bulletin`](crate::Bulletin) carries a
//! [`TemplateChoice`]. Resolution follows two tiers:
//!
//! 1. An explicit template name was supplied: load it from the instance folder
//!    (or [`DEFAULT_TEMPLATE_FOLDER`] when none was given).
//! 2. Otherwise: use the variant's [`DefaultTemplate`], bundled into the crate.
//!
//! Tier selection is keyed on the template *name* alone. A folder supplied
//! without a name is stored but never consulted.
//!
//! When rendering from a folder, the bundled templates and every template file
//! in the folder are registered as partials under their file stem, so a custom
//! template can include or wrap another one:
//!
//! ```text
//! {{#> layout}}<p>{{data.title}}</p>{{/layout}}
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use handlebars::{
    Context as HbsContext, Handlebars, Helper, HelperResult, Output, RenderContext,
    RenderErrorReason,
};
use serde::Serialize;
use tracing::debug;

use crate::error::{BulletinError, Result};

/// Folder used for a template override when no folder is supplied.
pub const DEFAULT_TEMPLATE_FOLDER: &str = "templates";

/// Format used by the `date` helper when no format argument is given.
const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// File extensions registered as partials when loading a template folder.
const PARTIAL_EXTENSIONS: &[&str] = &["html", "htm", "hbs", "txt", "md"];

/// A template shipped with the crate, used when no override is configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultTemplate {
    /// File name under the crate's `templates/` directory.
    pub name: &'static str,
    /// Embedded template source.
    pub source: &'static str,
}

impl DefaultTemplate {
    /// Bulletin layout.
    pub const BASE: Self = Self {
        name: "base.html",
        source: include_str!("../templates/base.html"),
    };

    /// Generic section: dumps its data as JSON.
    pub const SECTION: Self = Self {
        name: "section.html",
        source: include_str!("../templates/section.html"),
    };

    /// Feed summary section.
    pub const FEED: Self = Self {
        name: "individual_rss.html",
        source: include_str!("../templates/individual_rss.html"),
    };

    /// Plain text / markdown section.
    pub const TEXT: Self = Self {
        name: "plain_text.html",
        source: include_str!("../templates/plain_text.html"),
    };

    /// HTTP GET section.
    pub const HTTP_GET: Self = Self {
        name: "http_get.html",
        source: include_str!("../templates/http_get.html"),
    };

    /// All bundled templates.
    pub const ALL: &'static [Self] = &[
        Self::BASE,
        Self::SECTION,
        Self::FEED,
        Self::TEXT,
        Self::HTTP_GET,
    ];

    /// Partial name: the file name without its extension.
    #[must_use]
    pub fn partial_name(&self) -> &'static str {
        self.name
            .rsplit_once('.')
            .map_or(self.name, |(stem, _)| stem)
    }
}

/// Where a resolved template is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateLocation {
    /// A directory on disk.
    Folder(PathBuf),
    /// Embedded in the crate.
    Bundled(&'static str),
}

/// Outcome of template resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub name: String,
    pub location: TemplateLocation,
}

impl ResolvedTemplate {
    /// Folder the template is loaded from, or `None` for bundled templates.
    #[must_use]
    pub fn folder(&self) -> Option<&Path> {
        match &self.location {
            TemplateLocation::Folder(dir) => Some(dir),
            TemplateLocation::Bundled(_) => None,
        }
    }
}

/// Template selection for one section or bulletin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateChoice {
    template: Option<String>,
    folder: PathBuf,
    default: DefaultTemplate,
}

impl TemplateChoice {
    /// A choice with no override, falling back to `default`.
    #[must_use]
    pub fn new(default: DefaultTemplate) -> Self {
        Self {
            template: None,
            folder: PathBuf::from(DEFAULT_TEMPLATE_FOLDER),
            default,
        }
    }

    /// Set or clear the template name override.
    pub fn set_template(&mut self, template: Option<String>) {
        self.template = template;
    }

    /// Set the folder used together with a template override.
    pub fn set_folder(&mut self, folder: impl Into<PathBuf>) {
        self.folder = folder.into();
    }

    /// Template name override, if one was supplied.
    #[must_use]
    pub fn template(&self) -> Option<&str> {
        self.template.as_deref()
    }

    #[must_use]
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    #[must_use]
    pub const fn default_template(&self) -> DefaultTemplate {
        self.default
    }

    /// Decide which template to render with.
    #[must_use]
    pub fn resolve(&self) -> ResolvedTemplate {
        match &self.template {
            Some(name) => ResolvedTemplate {
                name: name.clone(),
                location: TemplateLocation::Folder(self.folder.clone()),
            },
            None => ResolvedTemplate {
                name: self.default.name.to_string(),
                location: TemplateLocation::Bundled(self.default.source),
            },
        }
    }

    /// Resolve and render with `data` as the template context.
    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        let resolved = self.resolve();
        TemplateEngine::new()?.render(&resolved, data)
    }
}

/// Formats an RFC 3339 timestamp with a chrono format string.
/// Usage: `{{date pub_date}}` or `{{date pub_date "%d %b %Y"}}`
fn date_helper(
    h: &Helper,
    r: &Handlebars,
    _: &HbsContext,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("date", 0))?
        .value();
    let format = h
        .param(1)
        .and_then(|p| p.value().as_str())
        .unwrap_or(DEFAULT_DATE_FORMAT);

    let Some(raw) = value.as_str() else {
        return Ok(());
    };

    let rendered = match raw.parse::<DateTime<Utc>>() {
        Ok(ts) => ts.format(format).to_string(),
        Err(_) => raw.to_string(),
    };
    out.write(&r.get_escape_fn()(&rendered))?;
    Ok(())
}

/// Writes a value as pretty JSON; strings are written as-is.
/// Usage: `{{json data}}`
fn json_helper(
    h: &Helper,
    r: &Handlebars,
    _: &HbsContext,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = h
        .param(0)
        .ok_or(RenderErrorReason::ParamNotFoundForIndex("json", 0))?
        .value();

    let text = match value.as_str() {
        Some(s) => s.to_string(),
        None => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
    };
    out.write(&r.get_escape_fn()(&text))?;
    Ok(())
}

/// Template engine holding helpers and partials for a single render.
pub struct TemplateEngine<'a> {
    handlebars: Handlebars<'a>,
}

impl TemplateEngine<'_> {
    /// Create an engine with helpers and the bundled templates registered as partials.
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();

        // Missing variables render as empty
        handlebars.set_strict_mode(false);

        handlebars.register_helper("date", Box::new(date_helper));
        handlebars.register_helper("json", Box::new(json_helper));

        for bundled in DefaultTemplate::ALL {
            handlebars.register_partial(bundled.partial_name(), bundled.source)?;
        }

        Ok(Self { handlebars })
    }

    /// Register every template file in `dir` as a partial keyed by file stem.
    ///
    /// Files that cannot be read or compiled are skipped; a render that
    /// references one of them fails on the missing partial instead.
    fn load_partials(&mut self, dir: &Path) -> Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let is_template = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| PARTIAL_EXTENSIONS.contains(&ext));
            if !is_template {
                continue;
            }

            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    debug!(partial = name, error = %e, "Skipping unreadable partial");
                    continue;
                }
            };
            if let Err(e) = self.handlebars.register_partial(name, content) {
                debug!(partial = name, error = %e, "Skipping partial with syntax error");
                continue;
            }
            debug!(partial = name, "Loaded partial");
        }
        Ok(())
    }

    /// Render a resolved template with the given context.
    pub fn render<T: Serialize>(&mut self, resolved: &ResolvedTemplate, data: &T) -> Result<String> {
        let source = match &resolved.location {
            TemplateLocation::Bundled(source) => (*source).to_string(),
            TemplateLocation::Folder(dir) => {
                let path = dir.join(&resolved.name);
                if !path.is_file() {
                    return Err(BulletinError::TemplateNotFound {
                        name: resolved.name.clone(),
                        folder: dir.clone(),
                    });
                }
                self.load_partials(dir)?;
                std::fs::read_to_string(&path)?
            }
        };

        debug!(template = %resolved.name, folder = ?resolved.folder(), "Rendering template");

        self.handlebars
            .register_template_string(&resolved.name, source)?;
        Ok(self.handlebars.render(&resolved.name, data)?)
    }
}
