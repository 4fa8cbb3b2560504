use crate::{JournalError, Result};
use regex::Regex;

use std::sync::LazyLock;

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s|^)(\S+):([^,]+)?(?:,|$)").expect("valid tag regex"));

/// Something that carries tags and free-form comments, i.e. transactions and
/// postings.
pub trait Annotate {
    fn add_comment(&mut self, comment: &str);
    fn add_tag(&mut self, key: &str, value: &str) -> Result<()>;
}

/// Validate and normalize a tag before it is stored.
pub(crate) fn checked_tag(key: &str, value: &str) -> Result<(String, String)> {
    let value = value.trim_matches(|c| matches!(c, ' ' | ',' | '\t' | '\n'));
    if key.is_empty() || key.contains(char::is_whitespace) || value.contains(',') {
        return Err(JournalError::MalformedTag {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    Ok((key.to_string(), value.to_string()))
}

/// Split a comment into its `key:value,` tags and the text left over.
pub fn split_tags(text: &str) -> (Vec<(&str, &str)>, String) {
    let tags = TAG
        .captures_iter(text)
        .filter_map(|cap| {
            let key = cap.get(1)?.as_str();
            let value = cap.get(2).map(|v| v.as_str()).unwrap_or("");
            Some((key, value))
        })
        .collect();
    let rest = TAG.replace_all(text, "").trim().to_string();
    (tags, rest)
}

/// Attach a raw comment to `target`: tags go into its tag map, a later tag
/// replacing an earlier one with the same key, and any remaining text becomes
/// one comment.
pub fn annotate<A: Annotate + ?Sized>(target: &mut A, text: &str) -> Result<()> {
    let (tags, rest) = split_tags(text);
    for (key, value) in tags {
        target.add_tag(key, value)?;
    }
    if !rest.is_empty() {
        target.add_comment(&rest);
    }
    Ok(())
}
