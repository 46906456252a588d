//! Final field normalization and serialization of the Hexo post.

use serde_yaml::{Mapping, Value};

use crate::{
    format::DateFormatter,
    models::{ParsedMatter, Post},
};

/// Fields computed from the post itself win over same-named metadata;
/// `body` is the content slot and never a front matter field.
const RESERVED_KEYS: [&str; 6] = ["title", "urlname", "date", "tags", "categories", "body"];

/// Ordered front matter: title, urlname, date, extras, tags, categories.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputProps(Mapping);

impl OutputProps {
    /// Merges the post attributes with whatever the body's metadata provided.
    pub fn build(post: &Post, matter: &ParsedMatter, dates: &DateFormatter) -> Self {
        let empty = Mapping::new();
        let (date, tags, categories, extra) = match matter {
            ParsedMatter::Parsed { date, tags, categories, extra, .. } => {
                (date.clone(), tags.clone(), categories.clone(), extra)
            }
            ParsedMatter::ParseFailed { .. } => (None, None, None, &empty),
        };

        let mut props = Mapping::new();
        props.insert("title".into(), post.title.replace('"', "").into());
        props.insert("urlname".into(), post.slug.clone().into());
        props.insert(
            "date".into(),
            date.unwrap_or_else(|| dates.format(post.created_at)).into(),
        );
        for (key, value) in extra {
            if key.as_str().is_some_and(|k| RESERVED_KEYS.contains(&k)) {
                continue;
            }
            props.insert(key.clone(), value.clone());
        }
        props.insert("tags".into(), string_seq(tags.unwrap_or_default()));
        props.insert("categories".into(), string_seq(categories.unwrap_or_default()));

        Self(props)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().filter_map(Value::as_str)
    }

    /// YAML lines followed by the closing `---`.
    pub fn to_front_matter(&self) -> anyhow::Result<String> {
        let yaml = serde_yaml::to_string(&self.0)?;
        Ok(format!("{}\n---", yaml.trim_end()))
    }
}

fn string_seq(items: Vec<String>) -> Value {
    Value::Sequence(items.into_iter().map(Value::String).collect())
}

/// Fills `{% matter %}` and `{% raw %}` in the post template.
///
/// Unknown tags are written back untouched, so Hexo's own `{% ... %}` tags
/// survive a custom template.
pub fn render_template(template: &str, matter: &str, raw: &str) -> String {
    let mut output = String::with_capacity(template.len() + matter.len() + raw.len());
    let mut curr = template;

    while let Some(start) = curr.find("{%") {
        output.push_str(&curr[..start]);
        let rem = &curr[start..];

        let Some(end) = rem.find("%}") else {
            curr = rem;
            break;
        };
        match rem[2..end].trim() {
            "matter" => output.push_str(matter),
            "raw" => output.push_str(raw),
            _ => output.push_str(&rem[..end + 2]),
        }
        curr = &rem[end + 2..];
    }
    output.push_str(curr);
    output
}
