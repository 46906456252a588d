//! Front matter extraction.
//!
//! The platform body arrives entity-escaped, with rich-text `<br>` tags
//! leaking into what should be a plain metadata block and with its own
//! `:::tips` style callouts. This module decodes it, repairs the metadata
//! block, renders the callouts and splits metadata from content.

use anyhow::{Context, bail};
use log::{debug, warn};
use regex::{NoExpand, Regex};
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::sync::LazyLock;

use crate::{format::DateFormatter, models::ParsedMatter};

// From the first recognised key up to the first `---`.
static META_SPAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:title:|layout:|tags:|date:|categories:)[\s\S]+?---").expect("valid regex")
});
static LINE_BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br />|<br/>|<br>").expect("valid regex"));

/// Callout rules, applied in order. Closers go last so they never eat the
/// newline an opener needs.
static CALLOUTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"(?i):::tips\n",
            r#"<div style="background: #FFFBE6;padding:10px;border: 1px solid #C3C3C3;border-radius:5px;margin-bottom:5px;">"#,
        ),
        (
            r"(?i):::danger\n",
            r#"<div style="background: #FFF3F3;padding:10px;border: 1px solid #DEB8BE;border-radius:5px;margin-bottom:5px;">"#,
        ),
        (
            r"(?i):::info\n",
            r#"<div style="background: #E8F7FF;padding:10px;border: 1px solid #ABD2DA;border-radius:5px;margin-bottom:5px;">"#,
        ),
        (r"\s+:::", "</div>"),
    ]
    .into_iter()
    .map(|(pattern, html)| (Regex::new(pattern).expect("valid regex"), html))
    .collect()
});

#[derive(Debug, Deserialize)]
struct Metadata {
    date: Option<Value>,
    tags: Option<Value>,
    categories: Option<Value>,
    // Everything else, in written order.
    #[serde(flatten)]
    extra: Mapping,
}

/// The two halves of a document, borrowed from the source text.
#[derive(Debug, PartialEq)]
struct Split<'a> {
    data: &'a str,
    content: &'a str,
    json: bool,
}

pub fn decode_entities(body: &str) -> String {
    html_escape::decode_html_entities(body).into_owned()
}

/// Turns `<br>` variants into newlines inside the metadata span only.
pub fn normalize_meta_breaks(body: &str) -> String {
    META_SPAN
        .replace_all(body, |caps: &regex::Captures| {
            LINE_BREAK_TAG.replace_all(&caps[0], NoExpand("\n")).into_owned()
        })
        .into_owned()
}

/// Flat, per-occurrence callout substitution. Nesting is not checked.
pub fn rewrite_callouts(body: &str) -> String {
    CALLOUTS.iter().fold(body.to_string(), |acc, (re, html)| {
        re.replace_all(&acc, NoExpand(*html)).into_owned()
    })
}

/// Decodes, repairs and splits a post body.
///
/// Never fails: anything that cannot be read as metadata degrades to
/// [`ParsedMatter::ParseFailed`] carrying the processed text.
pub fn parse_matter(body: &str, dates: &DateFormatter) -> ParsedMatter {
    let text = rewrite_callouts(&normalize_meta_breaks(&decode_entities(body)));

    match read_metadata(&text) {
        Ok(Some((meta, content))) => ParsedMatter::Parsed {
            date: meta.date.as_ref().and_then(|d| dates.normalize(d)),
            tags: meta.tags.as_ref().and_then(string_list),
            categories: meta.categories.as_ref().and_then(string_list),
            extra: meta.extra,
            body: content.to_string(),
        },
        Ok(None) => {
            debug!("no front matter block");
            ParsedMatter::ParseFailed { body: text }
        }
        Err(e) => {
            warn!("front matter ignored: {e:#}");
            ParsedMatter::ParseFailed { body: text }
        }
    }
}

fn read_metadata(text: &str) -> anyhow::Result<Option<(Metadata, &str)>> {
    let Some(split) = split_matter(text) else {
        return Ok(None);
    };
    if split.data.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = if split.json {
        let json: serde_json::Value = serde_json::from_str(&format!("{{{}}}", split.data))
            .context("invalid JSON front matter")?;
        serde_yaml::to_value(json)?
    } else {
        serde_yaml::from_str(&expand_leading_tabs(split.data)).context("invalid YAML front matter")?
    };
    if !value.is_mapping() {
        bail!("front matter is not a key-value block");
    }

    let meta = serde_yaml::from_value(value).context("unexpected front matter shape")?;
    Ok(Some((meta, split.content)))
}

fn separator_line(line: &str) -> Option<&str> {
    let line = line.trim_end_matches(['\n', '\r']);
    let uniform = |c: u8| line.bytes().all(|b| b == c);
    (line.len() >= 3 && (uniform(b'-') || uniform(b';'))).then_some(line)
}

/// Finds the metadata block.
///
/// Either the text opens with a separator line and the block runs to the
/// next identical separator line, or the text opens with metadata directly
/// and the block runs to the first separator line.
fn split_matter(text: &str) -> Option<Split<'_>> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;

    if text.starts_with("---") || text.starts_with(";;;") {
        let sep = separator_line(first).filter(|_| first.ends_with('\n'))?;
        let mut offset = first.len();
        for line in lines {
            if separator_line(line) == Some(sep) {
                return Some(Split {
                    data: text[first.len()..offset].trim_end_matches(['\n', '\r']),
                    content: &text[offset + line.len()..],
                    json: sep.starts_with(';'),
                });
            }
            offset += line.len();
        }
        return None;
    }

    let mut offset = first.len();
    for line in lines {
        if let Some(sep) = separator_line(line) {
            return Some(Split {
                data: text[..offset].trim_end_matches(['\n', '\r']),
                content: &text[offset + line.len()..],
                json: sep.starts_with(';'),
            });
        }
        offset += line.len();
    }
    None
}

// YAML forbids tabs for indentation; editors insert them anyway.
fn expand_leading_tabs(data: &str) -> String {
    data.split('\n')
        .map(|line| {
            let tabs = line.len() - line.trim_start_matches('\t').len();
            format!("{}{}", "  ".repeat(tabs), &line[tabs..])
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Accepts either a list or a single scalar (`tags: notes`). Blank entries
/// count as absent.
fn string_list(value: &Value) -> Option<Vec<String>> {
    fn scalar(v: &Value) -> Option<String> {
        match v {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    match value {
        Value::Sequence(items) => Some(items.iter().filter_map(scalar).collect()),
        Value::Null => None,
        other => scalar(other).map(|s| vec![s]),
    }
}
