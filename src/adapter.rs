//! The conversion pipeline.
//!
//! One post in, one Hexo file out:
//! 1. image CDN rewrite (only when enabled, the single await point)
//! 2. video then music embeds
//! 3. front matter extraction
//! 4. field normalization
//! 5. serialization through the post template

use anyhow::Context;
use log::debug;

use crate::{
    cdn::{CdnRewriter, ImageRewriter},
    config::Config,
    embed,
    format::{self, DateFormatter},
    frontmatter,
    models::Post,
    render::{self, OutputProps},
};

/// Converts posts with a fixed configuration.
///
/// Holds no mutable state, so one adapter can serve any number of
/// concurrent conversions.
pub struct Adapter {
    config: Config,
    dates: DateFormatter,
    images: Option<Box<dyn ImageRewriter>>,
}

impl Adapter {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let dates = DateFormatter::from_settings(&config.output).context("invalid [output] settings")?;
        let images: Option<Box<dyn ImageRewriter>> = if config.img_cdn.enabled {
            Some(Box::new(CdnRewriter::new(&config.img_cdn)?))
        } else {
            None
        };
        Ok(Self { config, dates, images })
    }

    /// Swaps in another image rewriter. It still only runs when
    /// `img_cdn.enabled` is set.
    pub fn with_image_rewriter(mut self, rewriter: impl ImageRewriter + 'static) -> Self {
        self.images = Some(Box::new(rewriter));
        self
    }

    pub async fn convert(&self, post: Post) -> anyhow::Result<String> {
        let post = match (&self.images, self.config.img_cdn.enabled) {
            (Some(images), true) => images
                .rewrite(post)
                .await
                .context("image CDN rewrite failed")?,
            _ => post,
        };
        debug!("converting {}", post.slug);

        let body = embed::rewrite_embeds(&post.body);
        let matter = frontmatter::parse_matter(&body, &self.dates);
        let props = OutputProps::build(&post, &matter, &self.dates);
        let raw = format::format_raw(matter.body());

        let front_matter = props
            .to_front_matter()
            .with_context(|| format!("serializing front matter of {}", post.slug))?;
        Ok(render::render_template(&self.config.output.template, &front_matter, &raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn post(body: &str) -> Post {
        Post {
            title: "Hello \"World\"".to_string(),
            slug: "hello-world".to_string(),
            created_at: Utc.with_ymd_and_hms(2022, 3, 4, 1, 2, 3).unwrap(),
            body: body.to_string(),
        }
    }

    fn adapter() -> Adapter {
        Adapter::new(Config::default()).unwrap()
    }

    /// Splits a rendered file into its YAML block and body.
    fn sections(out: &str) -> (serde_yaml::Mapping, String) {
        let rest = out.strip_prefix("---\n\n").expect("opening delimiter and blank line");
        let (yaml, body) = rest.split_once("\n---\n\n").expect("closing delimiter and blank line");
        (serde_yaml::from_str(yaml).unwrap(), body.to_string())
    }

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ImageRewriter for Counting {
        async fn rewrite(&self, mut post: Post) -> anyhow::Result<Post> {
            self.0.fetch_add(1, Ordering::SeqCst);
            post.body = post.body.replace("old.png", "new.png");
            Ok(post)
        }
    }

    struct Broken;

    #[async_trait]
    impl ImageRewriter for Broken {
        async fn rewrite(&self, _post: Post) -> anyhow::Result<Post> {
            anyhow::bail!("upload refused")
        }
    }

    fn cdn_enabled() -> Config {
        let mut config = Config::default();
        config.img_cdn.enabled = true;
        config.img_cdn.base_url = "https://img.example.com".to_string();
        config
    }

    #[tokio::test]
    async fn post_without_front_matter_gets_default_props() {
        let out = adapter().convert(post("Just text &amp; more.\n\n:::tips\nnote\n:::")).await.unwrap();
        let (props, body) = sections(&out);

        assert_eq!(props.get("title").and_then(|v| v.as_str()), Some("Hello World"));
        assert_eq!(props.get("urlname").and_then(|v| v.as_str()), Some("hello-world"));
        assert_eq!(props.get("date").and_then(|v| v.as_str()), Some("2022-03-04 09:02:03"));
        assert_eq!(props.get("tags"), Some(&serde_yaml::Value::Sequence(vec![])));
        assert_eq!(props.get("categories"), Some(&serde_yaml::Value::Sequence(vec![])));
        assert_eq!(
            body,
            "Just text & more.\n\n<div style=\"background: #FFFBE6;padding:10px;border: 1px solid #C3C3C3;border-radius:5px;margin-bottom:5px;\">note</div>"
        );
    }

    #[tokio::test]
    async fn front_matter_fields_are_carried_over() {
        let src = "---\ntitle: ignored\ndate: 2020-05-06 07:08:09\nlayout: post\ntags: [a, b]\ncategories: [notes]\n---\nBody";
        let out = adapter().convert(post(src)).await.unwrap();

        assert!(out.starts_with("---\n\ntitle: Hello World\nurlname: hello-world\n"));
        let (props, body) = sections(&out);
        assert_eq!(props.get("title").and_then(|v| v.as_str()), Some("Hello World"));
        assert_eq!(props.get("date").and_then(|v| v.as_str()), Some("2020-05-06 07:08:09"));
        assert_eq!(props.get("layout").and_then(|v| v.as_str()), Some("post"));
        let tags: Vec<String> = serde_yaml::from_value(props.get("tags").cloned().unwrap()).unwrap();
        assert_eq!(tags, ["a", "b"]);
        assert_eq!(body, "Body");

        let keys: Vec<_> = props.keys().filter_map(|k| k.as_str()).collect();
        assert_eq!(keys, ["title", "urlname", "date", "layout", "tags", "categories"]);
    }

    #[tokio::test]
    async fn blank_metadata_values_fall_back_to_defaults() {
        let out = adapter().convert(post("---\ndate: \"\"\ntags: \"\"\n---\nBody")).await.unwrap();
        let (props, body) = sections(&out);

        assert_eq!(props.get("date").and_then(|v| v.as_str()), Some("2022-03-04 09:02:03"));
        assert_eq!(props.get("tags"), Some(&serde_yaml::Value::Sequence(vec![])));
        assert_eq!(body, "Body");
    }

    #[tokio::test]
    async fn embeds_are_rendered_in_the_body() {
        let src = "[demo](https://bilibili.com/video/av123)\n\n[song](https://music.163.com/song?id=1)";
        let out = adapter().convert(post(src)).await.unwrap();
        let (_, body) = sections(&out);

        assert!(body.contains("padding-bottom: 75%;\"><iframe"));
        assert!(body.contains("src=\"https://bilibili.com/video/av123\""));
        assert!(body.contains("<iframe width=\"100%\" height=\"80px\" src=\"https://music.163.com/song?id=1\"></iframe>"));
    }

    #[tokio::test]
    async fn unterminated_front_matter_keeps_body() {
        let src = "---\ntags: [x]\nno closing line";
        let out = adapter().convert(post(src)).await.unwrap();
        let (props, body) = sections(&out);

        assert_eq!(body, src);
        assert_eq!(props.get("tags"), Some(&serde_yaml::Value::Sequence(vec![])));
        assert_eq!(props.get("date").and_then(|v| v.as_str()), Some("2022-03-04 09:02:03"));
    }

    #[tokio::test]
    async fn image_rewriter_runs_only_when_enabled() {
        let calls = Arc::new(AtomicUsize::new(0));

        let off = adapter().with_image_rewriter(Counting(calls.clone()));
        let out = off.convert(post("![x](old.png)")).await.unwrap();
        assert!(out.ends_with("![x](old.png)"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let on = Adapter::new(cdn_enabled()).unwrap().with_image_rewriter(Counting(calls.clone()));
        let out = on.convert(post("![x](old.png)")).await.unwrap();
        assert!(out.ends_with("![x](new.png)"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn bundled_cdn_rewriter_is_used_when_enabled() {
        let out = Adapter::new(cdn_enabled())
            .unwrap()
            .convert(post("![x](https://cdn.nlark.com/yuque/1.png)"))
            .await
            .unwrap();
        assert!(out.ends_with("![x](https://img.example.com/yuque/1.png)"));
    }

    #[tokio::test]
    async fn image_rewriter_failure_fails_the_conversion() {
        let adapter = Adapter::new(cdn_enabled()).unwrap().with_image_rewriter(Broken);
        let err = adapter.convert(post("body")).await.unwrap_err();
        assert!(format!("{err:#}").contains("upload refused"));
    }

    #[test]
    fn invalid_output_settings_are_rejected() {
        let mut config = Config::default();
        config.output.timezone = "nowhere".to_string();
        assert!(Adapter::new(config).is_err());
    }

    #[test]
    fn enabled_cdn_without_base_url_is_rejected() {
        let mut config = Config::default();
        config.img_cdn.enabled = true;
        assert!(Adapter::new(config).is_err());
    }
}
