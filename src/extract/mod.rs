//! Mapping rendered search results to `MessageRecord`s

mod extractor;
mod formatting;
mod page;
mod record;

pub use extractor::{MessageExtractor, derive_identity_key, parse_timestamp};
pub use formatting::{HtmdFormatter, TextFormatter};
pub use page::{PageCompleteness, ResultPage};
pub use record::MessageRecord;
