use crate::{JournalError, Result};
use chrono::{Local, NaiveDate};

/// Knobs for a [`JournalParser`][crate::JournalParser] run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParseOptions {
    /// Fail with [`JournalError::OrphanPosting`] on a posting that shows up before
    /// any transaction, instead of dropping it.
    pub strict_postings: bool,
    /// Date given to transactions created before any header was seen.
    /// Defaults to the local date at parse time.
    pub today: Option<NaiveDate>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn strict_postings(mut self, strict: bool) -> Self {
        self.strict_postings = strict;
        self
    }

    pub fn today(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    /// Set an option by name, e.g. from a `key=value` command line argument.
    pub fn set(&mut self, key: &str, val: &str) -> Result<()> {
        match key {
            "strict-postings" => {
                self.strict_postings = match val {
                    "true" | "yes" | "1" => true,
                    "false" | "no" | "0" => false,
                    _ => {
                        return Err(JournalError::TypeMismatch {
                            expected: "boolean",
                            found: val.to_string(),
                        })
                    }
                }
            }
            "today" => {
                let date = ["%Y/%m/%d", "%Y-%m-%d"]
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(val, fmt).ok())
                    .ok_or(JournalError::TypeMismatch {
                        expected: "date",
                        found: val.to_string(),
                    })?;
                self.today = Some(date);
            }
            _ => {
                return Err(JournalError::TypeMismatch {
                    expected: "option name",
                    found: key.to_string(),
                })
            }
        }
        Ok(())
    }

    /// Placeholder date, formatted the way transaction dates are stored.
    pub(crate) fn today_str(&self) -> String {
        self.today
            .unwrap_or_else(|| Local::now().date_naive())
            .format("%Y/%m/%d")
            .to_string()
    }
}
