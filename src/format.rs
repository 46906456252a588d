//! Date and raw-body formatting helpers shared by the pipeline.

use anyhow::{Context, bail};
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc,
    format::{Item, StrftimeItems},
};
use log::warn;
use regex::{NoExpand, Regex};
use serde_yaml::Value;
use std::sync::LazyLock;

use crate::config::OutputSettings;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Renders every date the adapter emits in one canonical format.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    format: String,
    offset: FixedOffset,
}

impl DateFormatter {
    pub fn new(format: &str, timezone: &str) -> anyhow::Result<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            bail!("invalid date format {format:?}");
        }
        let offset = timezone
            .parse::<FixedOffset>()
            .with_context(|| format!("invalid timezone offset {timezone:?}"))?;
        Ok(Self { format: format.to_string(), offset })
    }

    pub fn from_settings(settings: &OutputSettings) -> anyhow::Result<Self> {
        Self::new(&settings.date_format, &settings.timezone)
    }

    pub fn format(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.offset).format(&self.format).to_string()
    }

    /// Normalizes a `date` value found in front matter.
    ///
    /// Dates without an offset are read in the configured timezone. Strings
    /// that are not recognisable dates are kept (trimmed) rather than dropped.
    pub fn normalize(&self, value: &Value) -> Option<String> {
        match value {
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(self.normalize_str(s)),
            Value::Number(n) => Some(n.to_string()),
            Value::Null => None,
            Value::Tagged(tagged) => self.normalize(&tagged.value),
            other => {
                warn!("ignoring non-scalar date {other:?}");
                None
            }
        }
    }

    fn normalize_str(&self, raw: &str) -> String {
        let s = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return self.render(dt.with_timezone(&self.offset));
        }
        let naive = NAIVE_DATETIME_FORMATS
            .iter()
            .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
            .or_else(|| {
                NAIVE_DATE_FORMATS
                    .iter()
                    .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            });
        match naive.and_then(|n| self.offset.from_local_datetime(&n).single()) {
            Some(dt) => self.render(dt),
            None => {
                warn!("unrecognised date {s:?}, keeping it as written");
                s.to_string()
            }
        }
    }

    fn render(&self, dt: DateTime<FixedOffset>) -> String {
        dt.format(&self.format).to_string()
    }
}

static HIDDEN_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<div style="display:none">[\s\S]*?</div>"#).expect("valid regex")
});
static DOUBLE_BR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:<br>\s){2}").expect("valid regex"));
static DOUBLE_BR_SELF_CLOSING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:<br />\n?){2}").expect("valid regex"));
static EMPTY_ANCHOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<a name=".*?"></a>"#).expect("valid regex"));

/// Cleans editor leftovers out of the final body.
pub fn format_raw(body: &str) -> String {
    let body = HIDDEN_BLOCK.replace_all(body, "");
    let body = DOUBLE_BR.replace_all(&body, NoExpand("<br>"));
    let body = DOUBLE_BR_SELF_CLOSING.replace_all(&body, NoExpand("<br />\n"));
    let body = body.replace("<br />", "\n");
    EMPTY_ANCHOR.replace_all(&body, "").into_owned()
}
