//! Converts knowledge-base post exports into Hexo posts.
//!
//! ```rust,ignore
//! let adapter = Adapter::new(Config::load(None)?)?;
//! let text = adapter.convert(post).await?;
//! ```

pub mod adapter;
pub mod cdn;
pub mod config;
pub mod embed;
pub mod format;
pub mod frontmatter;
pub mod models;
pub mod render;

pub use adapter::Adapter;
pub use config::Config;
pub use models::{ParsedMatter, Post};
