//! Media embed rewriters.
//!
//! Markdown links pointing at a supported media platform are swapped for
//! inline player markup. Each rule is a single flat regex substitution;
//! links to anything else are left alone.

use log::debug;
use regex::{Captures, Regex};
use std::sync::LazyLock;

/// One platform: a link pattern with a `url` capture and the markup it becomes.
pub struct EmbedRule {
    pub name: &'static str,
    pattern: LazyLock<Regex>,
    render: fn(&str) -> String,
}

impl EmbedRule {
    /// Replaces every matching `[label](url)` link in `body`.
    pub fn apply(&self, body: &str) -> String {
        let mut hits = 0usize;
        let out = self.pattern.replace_all(body, |caps: &Captures| {
            hits += 1;
            (self.render)(&caps["url"])
        });
        if hits > 0 {
            debug!("embedded {} {} link(s)", hits, self.name);
        }
        out.into_owned()
    }
}

// Path characters after the host: `/` segments over `. ? = & % # ! a-zA-Z0-9 _ -`.
macro_rules! link_pattern {
    ($host:literal) => {
        concat!(
            r"\[[^\]\n]*\]\((?P<url>(?:http:)?(?:https:)?(?://)?",
            $host,
            r"(?::\d+)?(?:/(?:\.?\??=?&?%?[#!a-zA-Z0-9_-]\??)*)*)\)"
        )
    };
}

/// Video platform: responsive 4:3 frame.
pub static BILIBILI: EmbedRule = EmbedRule {
    name: "bilibili",
    pattern: LazyLock::new(|| {
        Regex::new(link_pattern!(r"(?:(?:[a-zA-Z0-9_-]+\.?){1,2}\.)?(?:bilibili\.com)+"))
            .expect("bilibili pattern is valid")
    }),
    render: |url| {
        format!(
            concat!(
                "<div style=\"position: relative; width: 100%; height: 0; padding-bottom: 75%;\">",
                "<iframe style=\"position: absolute; width: 100%; height: 100%; Left: 0; top: 0;\" src=\"{}\"></iframe>",
                "</div>"
            ),
            url
        )
    },
};

/// Music platform: fixed-height player bar.
pub static MUSIC163: EmbedRule = EmbedRule {
    name: "music.163",
    pattern: LazyLock::new(|| {
        Regex::new(link_pattern!(r"(?:music\.163\.com)+")).expect("music.163 pattern is valid")
    }),
    render: |url| format!("<iframe width=\"100%\" height=\"80px\" src=\"{}\"></iframe>", url),
};

/// Runs the rules in their fixed order: video first, then music.
pub fn rewrite_embeds(body: &str) -> String {
    [&BILIBILI, &MUSIC163]
        .iter()
        .fold(body.to_string(), |acc, rule| rule.apply(&acc))
}
