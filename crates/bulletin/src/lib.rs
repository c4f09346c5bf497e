//! Bulletin: build documents from independently rendered sections and send
//! them by email.
//!
//! This crate provides:
//! - Sections summarizing RSS/Atom feeds, rendering HTML or markdown text, and
//!   showing HTTP GET results
//! - Handlebars templates with bundled defaults and per-instance overrides
//! - Bulletins that assemble sections in order and send the result over SMTP
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use bulletin::{Bulletin, EmailServer, Encoding, Section, SmtpConfig};
//!
//! # async fn example() -> bulletin::Result<()> {
//! let server = Arc::new(EmailServer::connect(&SmtpConfig::from_env()?).await?);
//!
//! let mut bulletin = Bulletin::new(server);
//! bulletin.add_section(Section::text("Good **morning**", Encoding::Markdown));
//! bulletin.add_section(Section::feed("https://blog.rust-lang.org/feed.xml"));
//!
//! bulletin.send("team@example.com", None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Templates
//!
//! Each section variant and the bulletin ship a default template. Supplying a
//! template name switches to a file in a template folder (`templates` unless
//! another folder is given). See [`template`] for the resolution rules.

pub mod bulletin;
pub mod config;
pub mod email;
pub mod error;
pub mod section;
pub mod template;

pub use bulletin::{Bulletin, BulletinConfig};
pub use config::{BulletinFile, SmtpConfig};
pub use email::{Email, EmailServer, MailTransport, Recipients};
pub use error::{BulletinError, Result};
pub use section::{
    Encoding, FeedSection, HttpGetSection, Process, ReturnType, Section, SectionConfig,
    TextSection,
};
pub use template::{DefaultTemplate, TemplateChoice, DEFAULT_TEMPLATE_FOLDER};
