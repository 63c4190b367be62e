//! Rendered message to `MessageRecord`
//!
//! `expand_truncated` is the only step that touches the browser. `extract`
//! itself is pure, so running it twice over the same page yields the same
//! records in the same order.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::formatting::{HtmdFormatter, TextFormatter};
use super::page::ResultPage;
use super::record::MessageRecord;
use crate::error::{HarvestError, HarvestResult};
use crate::surface::{RenderedMessage, WorkspaceSurface};
use crate::workspace_search::with_timeout;

/// `/archives/<channel id>/p<ts without the dot>`
static PERMALINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/archives/([A-Z0-9]+)/p(\d{7,})").expect("Invalid permalink regex")
});

const UNKNOWN_SENDER: &str = "Unknown";
const UNKNOWN_CHANNEL: &str = "unknown-channel";

pub struct MessageExtractor<F = HtmdFormatter> {
    formatter: F,
    expand_timeout: Duration,
}

impl MessageExtractor<HtmdFormatter> {
    #[must_use]
    pub fn with_default_formatter(expand_timeout: Duration) -> Self {
        Self::new(HtmdFormatter::new(), expand_timeout)
    }
}

impl<F: TextFormatter> MessageExtractor<F> {
    pub fn new(formatter: F, expand_timeout: Duration) -> Self {
        Self {
            formatter,
            expand_timeout,
        }
    }

    /// Expand every truncated body on `page` in place
    ///
    /// Each expansion is bounded by the expand timeout. A message that cannot
    /// be expanded keeps `truncated = true`. Returns how many were expanded.
    pub async fn expand_truncated<S: WorkspaceSurface>(
        &self,
        surface: &S,
        page: &mut ResultPage,
    ) -> usize {
        let mut expanded = 0;
        for (index, message) in page.messages.iter_mut().enumerate() {
            if !message.truncated {
                continue;
            }
            let result = with_timeout(
                surface.expand_message(index),
                self.expand_timeout,
                "Message expansion",
            )
            .await;
            match result {
                Ok(Some(full)) if !full.truncated => {
                    *message = full;
                    expanded += 1;
                }
                Ok(_) => debug!(page = page.index, index, "Message stayed truncated"),
                Err(e) => debug!(page = page.index, index, "Could not expand message: {:#}", e),
            }
        }
        expanded
    }

    /// Map every rendered message on `page` to a record, in display order
    ///
    /// Messages that cannot be mapped are logged and skipped.
    #[must_use]
    pub fn extract(&self, page: &ResultPage) -> Vec<MessageRecord> {
        page.messages
            .iter()
            .enumerate()
            .filter_map(|(index, message)| match self.extract_one(index, message) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(page = page.index, "{}", e);
                    None
                }
            })
            .collect()
    }

    pub fn extract_one(&self, index: usize, message: &RenderedMessage) -> HarvestResult<MessageRecord> {
        let fail = |reason: String| HarvestError::Extraction { index, reason };

        let permalink = non_empty(message.permalink.as_deref()).map(str::to_string);
        let permalink_parts = permalink.as_deref().and_then(permalink_parts);

        let (ts, timestamp) = resolve_timestamp(message, permalink_parts)
            .ok_or_else(|| fail("no usable timestamp".to_string()))?;

        let channel = non_empty(message.channel.as_deref())
            .map(|c| c.trim_start_matches('#').to_string())
            .or_else(|| permalink_parts.map(|(id, _)| id.to_string()))
            .unwrap_or_else(|| UNKNOWN_CHANNEL.to_string());

        let key = derive_identity_key(permalink.as_deref(), &channel, Some(&ts))
            .ok_or_else(|| fail("no stable reference for identity key".to_string()))?;

        let sender = non_empty(message.sender.as_deref())
            .unwrap_or(UNKNOWN_SENDER)
            .to_string();

        let body = self
            .formatter
            .to_plain_text(&message.body_html)
            .map_err(|e| fail(format!("body conversion failed: {e:#}")))?;

        Ok(MessageRecord {
            key,
            timestamp,
            ts,
            sender,
            channel,
            permalink,
            body,
            truncated: message.truncated,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Channel id and dotless timestamp from a permalink
fn permalink_parts(permalink: &str) -> Option<(&str, &str)> {
    let captures = PERMALINK.captures(permalink)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

/// `data-ts`, then the `datetime` attribute, then the permalink suffix
fn resolve_timestamp(
    message: &RenderedMessage,
    permalink_parts: Option<(&str, &str)>,
) -> Option<(String, DateTime<Utc>)> {
    if let Some(ts) = non_empty(message.ts.as_deref())
        && let Some(timestamp) = parse_timestamp(ts)
    {
        return Some((ts.to_string(), timestamp));
    }

    if let Some(datetime) = non_empty(message.datetime.as_deref()) {
        let timestamp = parse_timestamp(datetime).or_else(|| {
            DateTime::parse_from_rfc3339(datetime)
                .ok()
                .map(|t| t.with_timezone(&Utc))
        });
        if let Some(timestamp) = timestamp {
            return Some((format_ts(timestamp), timestamp));
        }
    }

    let (_, digits) = permalink_parts?;
    let (secs, micros) = digits.split_at(digits.len() - 6);
    let ts = format!("{secs}.{micros}");
    let timestamp = parse_timestamp(&ts)?;
    Some((ts, timestamp))
}

fn format_ts(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}.{:06}",
        timestamp.timestamp(),
        timestamp.timestamp_subsec_micros()
    )
}

/// Parse a workspace timestamp (`"1704103200.123456"`)
#[must_use]
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    let (secs, frac) = ts.trim().split_once('.').unwrap_or((ts.trim(), ""));
    if secs.is_empty() || !secs.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !frac.bytes().all(|b| b.is_ascii_digit()) || frac.len() > 9 {
        return None;
    }
    let secs: i64 = secs.parse().ok()?;
    let nanos: u32 = if frac.is_empty() {
        0
    } else {
        format!("{frac:0<9}").parse().ok()?
    };
    DateTime::from_timestamp(secs, nanos)
}

/// Stable per-message key used for deduplication
///
/// Permalinks of the form `/archives/<channel>/p<digits>` give
/// `<channel>/p<digits>`, independent of the workspace host. Other permalinks
/// are used as-is minus query and fragment. Without a permalink the key is
/// `<channel>:<ts>`.
#[must_use]
pub fn derive_identity_key(
    permalink: Option<&str>,
    channel: &str,
    ts: Option<&str>,
) -> Option<String> {
    if let Some(permalink) = non_empty(permalink) {
        if let Some((channel_id, digits)) = permalink_parts(permalink) {
            return Some(format!("{channel_id}/p{digits}"));
        }
        return Some(match Url::parse(permalink) {
            Ok(mut url) => {
                url.set_query(None);
                url.set_fragment(None);
                url.to_string()
            }
            Err(_) => permalink.to_string(),
        });
    }
    let ts = non_empty(ts)?;
    Some(format!("{channel}:{ts}"))
}
