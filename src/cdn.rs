//! Image CDN rewriting.
//!
//! The only asynchronous collaborator of the pipeline. The bundled
//! [`CdnRewriter`] is purely textual; anything that uploads images
//! elsewhere can implement [`ImageRewriter`] and be plugged into the adapter.

use anyhow::bail;
use async_trait::async_trait;
use log::debug;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::{config::ImgCdnSettings, models::Post};

#[async_trait]
pub trait ImageRewriter: Send + Sync {
    /// Returns the post with image URLs in `body` rewritten.
    async fn rewrite(&self, post: Post) -> anyhow::Result<Post>;
}

// Markdown `![alt](url` or HTML `<img ... src="url`, split into prefix, host and path.
static IMAGE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(!\[[^\]]*\]\(|<img\s[^>]*?src=["'])(?:https?:)?//([^/\s)"'<>]+)(/[^\s)"'<>]*)?"#,
    )
    .expect("valid regex")
});

/// Moves images hosted on `source_hosts` under `base_url`, keeping the path.
#[derive(Debug, Clone)]
pub struct CdnRewriter {
    base_url: String,
    source_hosts: Vec<String>,
}

impl CdnRewriter {
    pub fn new(settings: &ImgCdnSettings) -> anyhow::Result<Self> {
        let base_url = settings.base_url.trim_end_matches('/');
        if base_url.is_empty() {
            bail!("img_cdn.base_url must be set when img_cdn.enabled is true");
        }
        Ok(Self {
            base_url: base_url.to_string(),
            source_hosts: settings.source_hosts.iter().map(|h| h.to_lowercase()).collect(),
        })
    }

    pub fn rewrite_body(&self, body: &str) -> String {
        IMAGE_URL
            .replace_all(body, |caps: &Captures| {
                let host = caps[2].to_lowercase();
                if self.source_hosts.iter().any(|h| *h == host) {
                    let path = caps.get(3).map_or("", |m| m.as_str());
                    format!("{}{}{}", &caps[1], self.base_url, path)
                } else {
                    caps[0].to_string()
                }
            })
            .into_owned()
    }
}

#[async_trait]
impl ImageRewriter for CdnRewriter {
    async fn rewrite(&self, mut post: Post) -> anyhow::Result<Post> {
        debug!("rewriting images of {} to {}", post.slug, self.base_url);
        post.body = self.rewrite_body(&post.body);
        Ok(post)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> CdnRewriter {
        CdnRewriter::new(&ImgCdnSettings {
            enabled: true,
            base_url: "https://img.example.com/blog/".to_string(),
            source_hosts: vec!["cdn.nlark.com".to_string()],
        })
        .unwrap()
    }

    #[test]
    fn rewrites_markdown_and_html_images_from_source_hosts() {
        let body = "![a](https://cdn.nlark.com/yuque/0/1.png) <img alt=\"b\" src=\"//CDN.nlark.com/2.jpg\">";
        assert_eq!(
            rewriter().rewrite_body(body),
            "![a](https://img.example.com/blog/yuque/0/1.png) <img alt=\"b\" src=\"https://img.example.com/blog/2.jpg\">"
        );
    }

    #[test]
    fn leaves_other_hosts_and_plain_links_alone() {
        let body = "![a](https://other.org/1.png) [link](https://cdn.nlark.com/file.zip)";
        assert_eq!(rewriter().rewrite_body(body), body);
    }

    #[test]
    fn requires_base_url() {
        let settings = ImgCdnSettings { enabled: true, ..ImgCdnSettings::default() };
        assert!(CdnRewriter::new(&settings).is_err());
    }
}
