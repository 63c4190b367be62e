//! Output formats and per-record rendering

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::extract::MessageRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One human-readable block per message
    #[default]
    Text,
    /// A single JSON array of message objects
    Json,
}

impl ExportFormat {
    /// File extension used for generated output names
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => f.write_str("text"),
            Self::Json => f.write_str("json"),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown export format '{other}' (expected text or json)")),
        }
    }
}

/// Render one record as a text block, terminated by a blank line
pub(crate) fn render_text_block(record: &MessageRecord) -> String {
    let mut block = format!(
        "[{}] {} in #{}\n",
        record.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        record.sender,
        record.channel
    );
    if let Some(permalink) = &record.permalink {
        block.push_str(permalink);
        block.push('\n');
    }
    block.push_str(record.body.trim_end());
    block.push('\n');
    if record.truncated {
        block.push_str("(message truncated: full text could not be expanded)\n");
    }
    block.push('\n');
    block
}
