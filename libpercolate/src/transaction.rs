use crate::amount::Amount;
use crate::line::Rule;
use crate::posting::Posting;
use crate::tags::{annotate, checked_tag, Annotate};
use crate::Result;
use chrono::NaiveDate;
use indexmap::IndexMap;
use pest::iterators::Pair;

use std::fmt;

/// The pieces of a transaction header line, borrowed from the input.
#[derive(Debug, PartialEq)]
pub struct TxnHeader<'th> {
    pub(crate) date: &'th str,
    pub(crate) status: Option<TransactionStatus>,
    pub(crate) code: Option<&'th str>,
    pub(crate) name: &'th str,
    pub(crate) note: Option<&'th str>,
}

impl<'th> TxnHeader<'th> {
    pub fn parse(token: Pair<'th, Rule>) -> Result<TxnHeader<'th>> {
        let mut header = TxnHeader {
            date: "",
            status: None,
            code: None,
            name: "",
            note: None,
        };

        for part in token.into_inner() {
            match part.as_rule() {
                Rule::date => header.date = part.as_str(),
                Rule::status => {
                    header.status = match part.as_str() {
                        "*" => Some(TransactionStatus::Cleared),
                        "!" => Some(TransactionStatus::Pending),
                        _ => None,
                    }
                }
                Rule::code => header.code = Some(part.as_str().trim()),
                Rule::description => header.name = part.as_str().trim(),
                Rule::text => header.note = Some(part.as_str()),
                // secondary dates are accepted but not kept
                _ => {}
            }
        }

        Ok(header)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TransactionStatus {
    Cleared, // '*'
    Pending, // '!'
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Cleared => write!(f, "*"),
            TransactionStatus::Pending => write!(f, "!"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    /// As written in the journal, usually `YYYY/MM/DD`.
    pub date: String,
    pub status: Option<TransactionStatus>,
    pub code: Option<String>,
    /// Header description; a leading `*`/`!` marker lives in `status`, not here.
    pub name: String,
    /// Journal comments that came right before the header.
    pub descriptions: Vec<String>,
    /// Comments on the header line and the indented ones below it.
    pub comments: Vec<String>,
    pub tags: IndexMap<String, String>,
    pub postings: Vec<Posting>,
}

impl Transaction {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            status: None,
            code: None,
            name: String::new(),
            descriptions: Vec::new(),
            comments: Vec::new(),
            tags: IndexMap::new(),
            postings: Vec::new(),
        }
    }

    /// No header and no postings yet. Descriptions, comments and tags don't count.
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.postings.is_empty()
    }

    pub fn add_description(&mut self, desc: &str) {
        self.descriptions.push(desc.trim().to_string());
    }

    pub fn add_posting(&mut self, posting: Posting) {
        self.postings.push(posting);
    }

    /// Fill in date, status, code and name from a header line, then attach its
    /// trailing comment.
    pub fn apply_header(&mut self, header: &TxnHeader) -> Result<()> {
        if !header.date.is_empty() {
            self.date = header.date.to_string();
        }
        self.status = header.status;
        self.code = header.code.filter(|c| !c.is_empty()).map(str::to_string);
        self.name = header.name.to_string();
        if let Some(note) = header.note {
            annotate(self, note)?;
        }
        Ok(())
    }

    /// The date as a calendar date, if it is in one of the usual layouts.
    pub fn naive_date(&self) -> Option<NaiveDate> {
        ["%Y/%m/%d", "%Y-%m-%d", "%Y.%m.%d"]
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(&self.date, fmt).ok())
    }

    /// Sum the postings of this transaction per account, in the order the
    /// accounts first appear.
    pub fn totals_by_account(&self) -> Result<IndexMap<&str, Amount>> {
        let mut totals: IndexMap<&str, Amount> = IndexMap::new();
        for posting in &self.postings {
            let total = totals.entry(posting.account.as_str()).or_default();
            *total = total.try_add(&posting.amount)?;
        }
        Ok(totals)
    }
}

impl Annotate for Transaction {
    fn add_comment(&mut self, comment: &str) {
        self.comments.push(comment.to_string());
    }

    fn add_tag(&mut self, key: &str, value: &str) -> Result<()> {
        let (key, value) = checked_tag(key, value)?;
        self.tags.insert(key, value);
        Ok(())
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for desc in &self.descriptions {
            writeln!(f, "; {}", desc)?;
        }

        let mut header: Vec<String> = vec![self.date.clone()];
        if let Some(status) = self.status {
            header.push(status.to_string());
        }
        if let Some(code) = self.code.as_ref().filter(|c| !c.is_empty()) {
            header.push(format!("({})", code));
        }
        // pushed even when empty, a header needs blanks after its date
        header.push(self.name.clone());

        let mut notes: Vec<String> = Vec::new();
        if let Some(first) = self.comments.first() {
            // an unterminated `key:value` would swallow the tags rendered after it
            if first.contains(':') && !first.ends_with(',') {
                notes.push(format!("{},", first));
            } else {
                notes.push(first.clone());
            }
        }
        notes.extend(self.tags.iter().map(|(k, v)| format!("{}:{},", k, v)));
        if !notes.is_empty() {
            header.push(";".to_string());
            header.extend(notes);
        }
        write!(f, "{}", header.join(" "))?;

        for comment in self.comments.iter().skip(1) {
            write!(f, "\n    ; {}", comment)?;
        }

        let account_width = self.postings.iter().map(Posting::account_width).max();
        let amount_width = self.postings.iter().map(Posting::amount_width).max();
        for posting in &self.postings {
            write!(
                f,
                "\n{}",
                posting.render_aligned(account_width.unwrap_or(0), amount_width.unwrap_or(0))
            )?;
        }
        Ok(())
    }
}
