use crate::posting::Posting;
use crate::transaction::TxnHeader;
use crate::Result;
use pest::iterators::Pair;
use pest::Parser;

#[derive(Parser)]
#[grammar = "journal.pest"]
pub struct LineParser;

/// What a single journal line turned out to be.
#[derive(Debug, PartialEq)]
pub enum Line<'l> {
    BlockEnd,
    BlockBegin,
    /// `;text` at column 0.
    JournalComment(&'l str),
    /// `;text` indented by two or more blanks.
    IndentedComment(&'l str),
    Header(TxnHeader<'l>),
    Posting(Posting),
    Include(&'l str),
    /// Anything else, ignored by the parser.
    Unmatched,
}

impl<'l> Line<'l> {
    /// Classify a line, without its line terminator.
    ///
    /// Shapes can overlap; they are tried in the order of the `line` rule in the
    /// grammar and the first one wins.
    pub fn classify(input: &'l str) -> Result<Line<'l>> {
        let shape = match LineParser::parse(Rule::line, input) {
            Ok(mut pairs) => pairs
                .next()
                .and_then(|line| line.into_inner().find(|p| p.as_rule() != Rule::EOI)),
            Err(_) => None,
        };

        match shape {
            Some(shape) => Self::into_line(shape),
            None => Ok(Line::Unmatched),
        }
    }

    /// Cheap check used while skipping the inside of a comment block.
    pub fn is_block_end(input: &str) -> bool {
        LineParser::parse(Rule::block_end, input).is_ok()
    }

    fn into_line(shape: Pair<'l, Rule>) -> Result<Line<'l>> {
        let line = match shape.as_rule() {
            Rule::block_end => Line::BlockEnd,
            Rule::block_begin => Line::BlockBegin,
            Rule::journal_comment => Line::JournalComment(inner_str(shape)),
            Rule::indented_comment => Line::IndentedComment(inner_str(shape)),
            Rule::transaction_header => Line::Header(TxnHeader::parse(shape)?),
            Rule::posting => Line::Posting(Posting::parse(shape)?),
            Rule::include => Line::Include(inner_str(shape).trim()),
            _ => Line::Unmatched,
        };
        Ok(line)
    }
}

/// Text of the first inner token, or an empty string.
pub fn inner_str(token: Pair<Rule>) -> &str {
    token.into_inner().next().map(|p| p.as_str()).unwrap_or("")
}
