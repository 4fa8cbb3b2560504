use crate::config::ParseOptions;
use crate::include::IncludeResolver;
use crate::journal::Journal;
use crate::line::Line;
use crate::tags::annotate;
use crate::transaction::Transaction;
use crate::{JournalError, Result};
use log::{debug, trace};

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::{Path, PathBuf};

/// Where the lines being parsed come from.
#[derive(Clone, Debug)]
enum Source {
    File(PathBuf),
    Stream,
}

impl Source {
    fn path(&self) -> Option<&Path> {
        match self {
            Source::File(path) => Some(path),
            Source::Stream => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => write!(f, "{}", path.display()),
            Source::Stream => write!(f, "<input>"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    Normal,
    InCommentBlock,
}

/// Drives the line-by-line walk over a journal and everything it includes.
#[derive(Debug, Default)]
pub struct JournalParser {
    options: ParseOptions,
    /// Canonical paths of the files currently being parsed, outermost first.
    include_stack: Vec<PathBuf>,
}

impl JournalParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            include_stack: Vec::new(),
        }
    }

    /// Parse a journal file and everything it includes.
    pub fn parse_file(&mut self, path: &Path) -> Result<Journal> {
        let path = path.canonicalize().map_err(|source| JournalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Journal::from(self.parse_path(&path)?))
    }

    /// Parse journal text that isn't backed by a file. Includes are looked up
    /// relative to `parent_dir`.
    pub fn parse_str(&mut self, input: &str, parent_dir: &Path) -> Result<Journal> {
        let transactions = self.parse_lines(Cursor::new(input), &Source::Stream, parent_dir)?;
        Ok(Journal::from(transactions))
    }

    fn parse_path(&mut self, path: &Path) -> Result<Vec<Transaction>> {
        if self.include_stack.iter().any(|p| p == path) {
            return Err(JournalError::CircularInclude {
                path: path.to_path_buf(),
                stack: self.include_stack.clone(),
            });
        }

        let file = File::open(path).map_err(|source| JournalError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parent_dir = path.parent().unwrap_or(Path::new(""));

        self.include_stack.push(path.to_path_buf());
        let parsed = self.parse_lines(
            BufReader::new(file),
            &Source::File(path.to_path_buf()),
            parent_dir,
        );
        self.include_stack.pop();
        parsed
    }

    fn parse_lines<R: BufRead>(
        &mut self,
        reader: R,
        source: &Source,
        parent_dir: &Path,
    ) -> Result<Vec<Transaction>> {
        let mut journal: Vec<Transaction> = Vec::new();
        let mut state = State::Normal;

        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|source_err| JournalError::Io {
                path: source.path().map(Path::to_path_buf).unwrap_or_default(),
                source: source_err,
            })?;
            let line = line.trim_end_matches('\r');

            state = self
                .consume(line, state, &mut journal, source, parent_dir)
                .map_err(|err| err.at(source, idx + 1))?;
        }

        Ok(journal)
    }

    fn consume(
        &mut self,
        line: &str,
        state: State,
        journal: &mut Vec<Transaction>,
        source: &Source,
        parent_dir: &Path,
    ) -> Result<State> {
        if state == State::InCommentBlock {
            return Ok(if Line::is_block_end(line) {
                State::Normal
            } else {
                State::InCommentBlock
            });
        }

        match Line::classify(line)? {
            Line::BlockEnd => {}
            Line::BlockBegin => return Ok(State::InCommentBlock),
            Line::JournalComment(text) => {
                let fresh = needs_fresh_transaction(journal);
                self.current(journal, fresh).add_description(text);
            }
            Line::IndentedComment(text) => {
                let txn = self.current(journal, false);
                if txn.postings.is_empty() {
                    annotate(txn, text)?;
                } else if let Some(posting) = txn.postings.last_mut() {
                    annotate(posting, text)?;
                }
            }
            Line::Header(header) => {
                let fresh = needs_fresh_transaction(journal);
                self.current(journal, fresh).apply_header(&header)?;
            }
            Line::Posting(posting) => match journal.last_mut() {
                Some(txn) => txn.add_posting(posting),
                None if self.options.strict_postings => return Err(JournalError::OrphanPosting),
                None => debug!("dropping posting to `{}' outside a transaction", posting.account),
            },
            Line::Include(raw) => {
                let resolver = IncludeResolver {
                    parent_dir,
                    including_file: source.path(),
                };
                let resolved = resolver.resolve(raw)?;
                let resolved = resolved
                    .canonicalize()
                    .map_err(|source| JournalError::Io {
                        path: resolved.clone(),
                        source,
                    })?;
                debug!("including {} from {}", resolved.display(), source);
                journal.extend(self.parse_path(&resolved)?);
            }
            Line::Unmatched => trace!("ignoring line `{}'", line),
        }

        Ok(State::Normal)
    }

    /// The transaction new content goes to, appending a fresh one when asked
    /// to or when there is none yet.
    fn current<'j>(&self, journal: &'j mut Vec<Transaction>, fresh: bool) -> &'j mut Transaction {
        if fresh || journal.is_empty() {
            journal.push(Transaction::new(&self.options.today_str()));
        }
        let last = journal.len() - 1;
        &mut journal[last]
    }
}

/// A header or journal comment starts a new transaction unless the last one
/// is still an empty placeholder.
fn needs_fresh_transaction(journal: &[Transaction]) -> bool {
    journal.last().map_or(true, |txn| !txn.is_empty())
}

/// Parse a journal file with default options.
pub fn parse_file(path: &Path) -> Result<Journal> {
    JournalParser::default().parse_file(path)
}

/// Parse journal text with default options; includes resolve against the
/// working directory.
pub fn parse_str(input: &str) -> Result<Journal> {
    JournalParser::default().parse_str(input, Path::new(""))
}

#[cfg(test)]
mod tests {
    use crate::config::ParseOptions;
    use crate::parser::{parse_file, parse_str, JournalParser};
    use crate::{Amount, JournalError};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use anyhow::{anyhow, Result};
    use std::fs;
    use std::path::Path;

    const SAMPLE: &str = "\
; Example journal
; second line

2021/01/01 * Opening balances
    Assets:Bank:Checking      1.000,00 EUR
    Equity:Opening

comment
2021/01/02 Hidden
    Expenses:Hidden   1 EUR
end comment

2021/01/03 (12) Corner shop  ; trip:weekend,
    ; paid with card
    Expenses:Food        12,50 EUR  ; kind:groceries,
    ; fresh stuff
    Assets:Bank:Checking
P 2021/01/03 EUR 1.2 USD
";

    fn fixed_options() -> Result<ParseOptions> {
        Ok(ParseOptions::new()
            .today(NaiveDate::from_ymd_opt(2021, 5, 20).ok_or(anyhow!("invalid date"))?))
    }

    #[test]
    fn parse_sample_journal() -> Result<()> {
        let journal = parse_str(SAMPLE)?;
        let txns = journal.transactions();

        assert_eq!(txns.len(), 2);

        assert_eq!(txns[0].descriptions, vec!["Example journal", "second line"]);
        assert_eq!(txns[0].name, "Opening balances");
        assert_eq!(txns[0].postings.len(), 2);
        assert_eq!(
            txns[0].postings[0].amount,
            Amount::new(Decimal::from(1000), "EUR")
        );
        assert!(txns[0].postings[1].amount.is_missing());

        let shop = &txns[1];
        assert_eq!(shop.date, "2021/01/03");
        assert_eq!(shop.code.as_deref(), Some("12"));
        assert_eq!(shop.tags.get("trip").map(String::as_str), Some("weekend"));
        assert_eq!(shop.comments, vec!["paid with card"]);
        assert_eq!(
            shop.postings[0].tags.get("kind").map(String::as_str),
            Some("groceries")
        );
        assert_eq!(shop.postings[0].comments, vec!["fresh stuff"]);
        Ok(())
    }

    #[test]
    fn consecutive_journal_comments_share_a_placeholder() -> Result<()> {
        let journal =
            JournalParser::new(fixed_options()?).parse_str("; one\n; two\n", Path::new(""))?;

        assert_eq!(journal.len(), 1);
        let txn = &journal.transactions()[0];
        assert_eq!(txn.descriptions, vec!["one", "two"]);
        assert_eq!(txn.date, "2021/05/20");
        assert!(txn.is_empty());
        Ok(())
    }

    #[test]
    fn comment_after_a_transaction_starts_a_new_one() -> Result<()> {
        let journal = parse_str("2021/01/01 A\n  X:Y  1\n; for B\n2021/01/02 B\n")?;
        let txns = journal.transactions();

        assert_eq!(txns.len(), 2);
        assert!(txns[0].descriptions.is_empty());
        assert_eq!(txns[1].descriptions, vec!["for B"]);
        assert_eq!(txns[1].name, "B");
        Ok(())
    }

    #[test]
    fn indented_comment_before_anything() -> Result<()> {
        let journal = parse_str("  ; lost:found,\n")?;
        assert_eq!(journal.len(), 1);
        assert_eq!(
            journal.transactions()[0].tags.get("lost").map(String::as_str),
            Some("found")
        );
        Ok(())
    }

    #[test]
    fn orphan_posting_is_dropped_by_default() -> Result<()> {
        let journal = parse_str("  Assets:Cash  5 EUR\n2021/01/01 Later\n")?;
        assert_eq!(journal.len(), 1);
        assert!(journal.transactions()[0].postings.is_empty());
        Ok(())
    }

    #[test]
    fn orphan_posting_fails_when_strict() -> Result<()> {
        let err = JournalParser::new(ParseOptions::new().strict_postings(true))
            .parse_str("\n  Assets:Cash  5 EUR\n", Path::new(""))
            .unwrap_err();

        assert!(matches!(err.root_cause(), JournalError::OrphanPosting));
        assert!(matches!(err, JournalError::At { line: 2, .. }));
        Ok(())
    }

    #[test]
    fn block_end_outside_a_block_is_harmless() -> Result<()> {
        let journal = parse_str("end comment\n2021/01/01 A\n  X:Y  1\n")?;
        assert_eq!(journal.len(), 1);
        Ok(())
    }

    #[test]
    fn numbers_inside_comment_blocks_are_not_parsed() -> Result<()> {
        let journal = parse_str("comment\n  X:Y  1.2.3\nend comment\n")?;
        assert!(journal.is_empty());
        Ok(())
    }

    #[test]
    fn bad_number_aborts_the_parse() {
        let err = parse_str("2021/01/01 A\n  X:Y  1.2.3 EUR\n").unwrap_err();
        assert!(matches!(err.root_cause(), JournalError::InvalidNumber(_)));
    }

    #[test]
    fn price_overflow_aborts_the_parse() {
        let err = parse_str("2021/01/01 X\n  A:B  10000000000000000000000000 AAA @ 100000 USD\n")
            .unwrap_err();
        assert!(matches!(err.root_cause(), JournalError::Overflow(_)));
        assert!(err.to_string().starts_with("<input>, line 2: "));
    }

    #[test]
    fn parsing_is_repeatable() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("main.journal");
        fs::write(&path, SAMPLE)?;

        assert_eq!(parse_file(&path)?, parse_file(&path)?);
        Ok(())
    }

    #[test]
    fn nested_includes_are_spliced_in_place() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(
            dir.path().join("main.journal"),
            "2021/01/01 Before\n  A:B  1\ninclude sub/child.journal\n2021/01/04 After\n  A:B  4\n",
        )?;
        fs::write(
            dir.path().join("sub/child.journal"),
            "2021/01/02 Child\n  C:D  2\ninclude grand.journal\n",
        )?;
        fs::write(
            dir.path().join("sub/grand.journal"),
            "2021/01/03 Grandchild\n  E:F  3\n",
        )?;

        let journal = parse_file(&dir.path().join("main.journal"))?;
        let names: Vec<&str> = journal.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Before", "Child", "Grandchild", "After"]);
        Ok(())
    }

    #[test]
    fn include_from_text_resolves_against_parent_dir() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::create_dir(dir.path().join("sub"))?;
        fs::write(
            dir.path().join("sub/child.journal"),
            "2021/01/02 Child\n  C:D  2\ninclude ../sibling.journal\n",
        )?;
        fs::write(dir.path().join("sibling.journal"), "2021/01/03 Sibling\n  E:F  3\n")?;

        let journal = JournalParser::default()
            .parse_str("include sub/child.journal\n", dir.path())?;
        let names: Vec<&str> = journal.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Child", "Sibling"]);
        Ok(())
    }

    #[test]
    fn missing_include_aborts_everything() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("main.journal");
        fs::write(&path, "2021/01/01 A\n  X:Y  1\ninclude nowhere.journal\n")?;

        let err = parse_file(&path).unwrap_err();
        assert!(matches!(
            err.root_cause(),
            JournalError::MissingIncludeFile { .. }
        ));
        Ok(())
    }

    #[test]
    fn circular_include_is_detected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("a.journal"), "include b.journal\n")?;
        fs::write(dir.path().join("b.journal"), "include a.journal\n")?;

        let err = parse_file(&dir.path().join("a.journal")).unwrap_err();
        match err.root_cause() {
            JournalError::CircularInclude { path, stack } => {
                assert!(path.ends_with("a.journal"));
                assert_eq!(stack.len(), 2);
            }
            other => return Err(anyhow!("unexpected error: {}", other)),
        }
        Ok(())
    }

    #[test]
    fn same_file_included_twice_is_not_circular() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(
            dir.path().join("main.journal"),
            "include prices.journal\ninclude prices.journal\n",
        )?;
        fs::write(dir.path().join("prices.journal"), "2021/01/01 P\n  X:Y  1\n")?;

        assert_eq!(parse_file(&dir.path().join("main.journal"))?.len(), 2);
        Ok(())
    }
}
