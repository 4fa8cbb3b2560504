//! Percolate - A plain text double-entry journal parser
//! ---
//!
//! Reads hledger-style journals into an ordered list of [`Transaction`]s, each holding
//! its [`Posting`]s. Amounts keep their currency and any `@`/`@@` price annotation,
//! and `include` directives are followed recursively, their transactions spliced in
//! place of the directive.
//!
//! ```text
//! ; groceries
//! 2024/03/01 * (42) Corner shop  ; receipt:1187,
//!     Expenses:Food          12,50 EUR
//!     Assets:Cash
//! ```
//!

extern crate pest;
#[macro_use]
extern crate pest_derive;

/// Amounts, prices, and the arithmetic combining them.
pub mod amount;

/// Parser configuration.
pub mod config;

mod include;

/// The parse result and reducers over it.
pub mod journal;

/// Line grammar and classification.
pub mod line;

/// Our main parser entrypoints.
pub mod parser;

mod posting;
mod tags;
mod transaction;

pub use amount::{Amount, Money, Price};
pub use config::ParseOptions;
pub use journal::{top_level_accounts, Journal};
pub use parser::{parse_file, parse_str, JournalParser};
pub use posting::Posting;
pub use tags::{annotate, split_tags, Annotate};
pub use transaction::{Transaction, TransactionStatus, TxnHeader};

use std::path::PathBuf;

/// Everything that can abort a parse.
///
/// Errors raised while a specific line was being consumed are wrapped in
/// [`JournalError::At`]; use [`JournalError::root_cause`] to get at the kind.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("cannot combine amounts in `{left}' and `{right}'")]
    CurrencyMismatch { left: String, right: String },

    #[error("could not find include file `{raw}' (looked at {})", resolved.display())]
    MissingIncludeFile { raw: String, resolved: PathBuf },

    #[error("malformed tag `{key}:{value}'")]
    MalformedTag { key: String, value: String },

    #[error("expected {expected}, got `{found}'")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("circular include of {}\ninclude stack: {}", path.display(), stack.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" -> "))]
    CircularInclude { path: PathBuf, stack: Vec<PathBuf> },

    #[error("invalid number `{0}'")]
    InvalidNumber(String),

    #[error("arithmetic overflow in `{0}'")]
    Overflow(String),

    #[error("posting before any transaction header")]
    OrphanPosting,

    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{origin}, line {line}: {source}")]
    At {
        origin: String,
        line: usize,
        #[source]
        source: Box<JournalError>,
    },
}

impl JournalError {
    /// Strip any line location wrappers, including the ones added by every
    /// file along an include chain.
    pub fn root_cause(&self) -> &JournalError {
        match self {
            JournalError::At { source, .. } => source.root_cause(),
            err => err,
        }
    }

    pub(crate) fn at(self, origin: impl ToString, line: usize) -> JournalError {
        JournalError::At {
            origin: origin.to_string(),
            line,
            source: Box::new(self),
        }
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;

#[cfg(test)]
mod tests {
    use crate::JournalError;
    use std::path::PathBuf;

    #[test]
    fn root_cause_unwraps_nested_locations() {
        let err = JournalError::MissingIncludeFile {
            raw: "missing.journal".to_string(),
            resolved: PathBuf::from("/books/missing.journal"),
        }
        .at("/books/2024.journal", 3)
        .at("/books/main.journal", 12);

        assert!(matches!(
            err.root_cause(),
            JournalError::MissingIncludeFile { .. }
        ));
        assert_eq!(
            format!("{}", err),
            "/books/main.journal, line 12: /books/2024.journal, line 3: \
             could not find include file `missing.journal' (looked at /books/missing.journal)"
        );
    }
}
