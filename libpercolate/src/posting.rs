use crate::amount::Amount;
use crate::line::Rule;
use crate::tags::{annotate, checked_tag, Annotate};
use crate::Result;
use indexmap::IndexMap;
use pest::iterators::Pair;

use std::fmt;

/// One account line inside a transaction.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Posting {
    /// Colon separated account path, without the parentheses of a virtual posting.
    pub account: String,
    pub amount: Amount,
    /// The account was written as `(Account:Name)`.
    pub is_virtual: bool,
    pub tags: IndexMap<String, String>,
    pub comments: Vec<String>,
    /// Expected balance after this posting (`= amount`). Informational only.
    pub assertion: Option<Amount>,
}

impl Posting {
    pub fn new(account: &str, amount: Amount) -> Self {
        let account = account.trim();
        let (account, is_virtual) = match account
            .strip_prefix('(')
            .and_then(|a| a.strip_suffix(')'))
        {
            Some(inner) => (inner.trim(), true),
            None => (account, false),
        };
        Self {
            account: account.to_string(),
            amount,
            is_virtual,
            ..Default::default()
        }
    }

    pub fn with_assertion(mut self, assertion: Amount) -> Self {
        self.assertion = match assertion {
            Amount::Missing => None,
            amount => Some(amount),
        };
        self
    }

    /// Build a posting from a `posting` token, trailing comment and tags included.
    pub fn parse(token: Pair<Rule>) -> Result<Posting> {
        let mut posting = Posting::default();
        let mut note = None;

        for part in token.into_inner() {
            match part.as_rule() {
                Rule::account => posting = Posting::new(part.as_str(), Amount::Missing),
                Rule::amount => posting.amount = Amount::parse(part)?,
                Rule::price => posting.amount = posting.amount.priced(part)?,
                Rule::assertion => {
                    let assertion = match part.into_inner().next() {
                        Some(amount) => Amount::parse(amount)?,
                        None => Amount::Missing,
                    };
                    posting = posting.with_assertion(assertion);
                }
                Rule::text => note = Some(part.as_str()),
                _ => {}
            }
        }

        if let Some(note) = note {
            annotate(&mut posting, note)?;
        }
        Ok(posting)
    }

    fn display_account(&self) -> String {
        if self.is_virtual {
            format!("({})", self.account)
        } else {
            self.account.clone()
        }
    }

    fn display_amount(&self) -> String {
        let mut rendered = self.amount.to_string();
        if let Some(assertion) = &self.assertion {
            rendered.push_str(&format!(" = {}", assertion));
        }
        rendered
    }

    /// Width the account column needs for this posting.
    pub(crate) fn account_width(&self) -> usize {
        self.display_account().chars().count()
    }

    pub(crate) fn amount_width(&self) -> usize {
        self.display_amount().chars().count()
    }

    /// Render with the account padded to `account_width` and the amount
    /// right-aligned in `amount_width` columns.
    pub fn render_aligned(&self, account_width: usize, amount_width: usize) -> String {
        let amount = self.display_amount();
        // tags first, so a trailing comment never swallows them
        let notes: Vec<String> = self
            .tags
            .iter()
            .map(|(key, value)| format!("{}:{},", key, value))
            .chain(self.comments.iter().cloned())
            .collect();

        let mut out = if amount.is_empty() {
            format!("    {}", self.display_account())
        } else {
            format!(
                "    {:<acct$}     {:>amt$}",
                self.display_account(),
                amount,
                acct = account_width,
                amt = amount_width
            )
        };

        for (idx, note) in notes.iter().enumerate() {
            if idx == 0 && !amount.is_empty() {
                out.push_str(&format!("    ; {}", note));
            } else {
                out.push_str(&format!("\n    ; {}", note));
            }
        }
        out
    }
}

impl Annotate for Posting {
    fn add_comment(&mut self, comment: &str) {
        self.comments.push(comment.trim().to_string());
    }

    fn add_tag(&mut self, key: &str, value: &str) -> Result<()> {
        let (key, value) = checked_tag(key, value)?;
        self.tags.insert(key, value);
        Ok(())
    }
}

impl fmt::Display for Posting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render_aligned(0, 0))
    }
}
