//! Prefix-based statement classification.
//!
//! Skips leading whitespace, any number of leading `--` line comments and a
//! single leading `/* ... */` block comment, then checks the remaining text
//! for the row-producing keyword.

use super::StatementKind;

/// Keyword that marks a statement as row-producing (matched case-insensitively).
pub const ROW_PRODUCING_KEYWORD: &str = "SELECT";

const LINE_COMMENT: &str = "--";
const BLOCK_COMMENT_OPEN: &str = "/*";
const BLOCK_COMMENT_CLOSE: &str = "*/";

/// Classifies a SQL statement as row-producing or mutating.
///
/// Statements that consist only of a leading comment classify as
/// [`StatementKind::Mutating`].
pub fn classify(sql: &str) -> StatementKind {
    match leading_statement(sql) {
        Some(body) if starts_with_keyword(body) => StatementKind::RowProducing,
        _ => StatementKind::Mutating,
    }
}

/// Returns the statement text that remains after stripping leading
/// whitespace and comments.
///
/// Returns `None` when a line comment runs to the end of the input, i.e.
/// no SQL follows it. Only one block comment is consumed; an unterminated
/// block comment is left in place.
pub fn leading_statement(sql: &str) -> Option<&str> {
    let mut rest = sql.trim_start();

    while let Some(comment) = rest.strip_prefix(LINE_COMMENT) {
        let newline = comment.find('\n')?;
        rest = comment[newline + 1..].trim_start();
    }

    if let Some(block) = rest.strip_prefix(BLOCK_COMMENT_OPEN) {
        if let Some(end) = block.find(BLOCK_COMMENT_CLOSE) {
            rest = block[end + BLOCK_COMMENT_CLOSE.len()..].trim_start();
        }
    }

    Some(rest)
}

fn starts_with_keyword(body: &str) -> bool {
    body.get(..ROW_PRODUCING_KEYWORD.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ROW_PRODUCING_KEYWORD))
}
