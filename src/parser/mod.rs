mod table_name;

pub use table_name::{extract_table_name, QualifiedTable, TableName};

use crate::error::{Result, SchemaGuardError};
use sqlparser::dialect::MySqlDialect;
use sqlparser::tokenizer::{Location, Token, Tokenizer};
use std::str::CharIndices;

/// Keywords that start an ALTER TABLE specification
const ALTER_SPEC_KEYWORDS: &[&str] = &["ADD", "DROP", "MODIFY", "CHANGE", "ALTER", "RENAME"];

pub struct SqlParser {
    dialect: MySqlDialect,
}

impl SqlParser {
    pub fn new() -> Self {
        Self {
            dialect: MySqlDialect {},
        }
    }

    /// Tokenize `sql`, pairing each token with the byte range it covers.
    fn tokenize(&self, sql: &str) -> Result<Vec<SourceToken>> {
        let tokens = Tokenizer::new(&self.dialect, sql)
            .tokenize_with_location()
            .map_err(|e| SchemaGuardError::parse_error(e.to_string()))?;

        let mut cursor = SourceCursor::new(sql);
        Ok(tokens
            .into_iter()
            .map(|t| {
                let start = cursor.seek(t.span.start);
                let end = cursor.seek(t.span.end);
                SourceToken {
                    token: t.token,
                    start,
                    end,
                }
            })
            .collect())
    }

    /// Split a script into individual statements on top-level semicolons.
    ///
    /// Semicolons inside string literals, quoted identifiers and comments are
    /// not separators. Comment-only fragments are dropped. Statements are
    /// sliced from the input, so literals keep their original escaping.
    pub fn split_statements(&self, sql: &str) -> Result<Vec<String>> {
        let mut statements = Vec::new();
        let mut span: Option<(usize, usize)> = None;

        for t in self.tokenize(sql)? {
            match t.token {
                Token::SemiColon => {
                    if let Some((start, end)) = span.take() {
                        statements.push(sql[start..end].to_string());
                    }
                }
                // Comments between statements belong to none of them
                Token::Whitespace(_) => {}
                _ => {
                    let start = span.map_or(t.start, |(start, _)| start);
                    span = Some((start, t.end));
                }
            }
        }

        if let Some((start, end)) = span {
            statements.push(sql[start..end].to_string());
        }

        Ok(statements)
    }

    /// Return the alteration part of an ALTER TABLE statement (everything after
    /// the table name), without a trailing semicolon.
    ///
    /// Statements that are not ALTER TABLE are returned trimmed and unchanged.
    pub fn alter_clause(&self, sql: &str) -> String {
        let sql = sql.trim();

        match self.tokenize(sql) {
            Ok(tokens) => Self::clause_from_tokens(sql, &tokens).unwrap_or_else(|| sql.to_string()),
            Err(_) => Self::clause_from_keywords(sql),
        }
    }

    fn clause_from_tokens(sql: &str, tokens: &[SourceToken]) -> Option<String> {
        let mut rest = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !matches!(t.token, Token::Whitespace(_)));

        let is_word = |t: &Token, kw: &str| {
            matches!(t, Token::Word(w) if w.quote_style.is_none() && w.value.eq_ignore_ascii_case(kw))
        };

        let (_, alter) = rest.next()?;
        let (_, table_kw) = rest.next()?;
        if !is_word(&alter.token, "ALTER") || !is_word(&table_kw.token, "TABLE") {
            return None;
        }

        let (mut end, name) = rest.next()?;
        if !matches!(name.token, Token::Word(_)) {
            return None;
        }

        // Qualified name: `db` . `table`
        if matches!(tokens.get(end + 1).map(|t| &t.token), Some(Token::Period))
            && matches!(tokens.get(end + 2).map(|t| &t.token), Some(Token::Word(_)))
        {
            end += 2;
        }

        let clause = sql.get(tokens[end].end..)?;
        Some(clause.trim().trim_end_matches(';').trim_end().to_string())
    }

    /// Used when the tokenizer rejects the input (e.g. an unterminated quote)
    fn clause_from_keywords(sql: &str) -> String {
        let parts: Vec<&str> = sql.split_whitespace().collect();
        if parts.len() < 3 || table_name::strip_alter_table(sql).is_none() {
            return sql.to_string();
        }

        let start = (3..parts.len())
            .find(|&i| {
                let upper = parts[i].to_uppercase();
                ALTER_SPEC_KEYWORDS.iter().any(|kw| upper.starts_with(kw))
            })
            .unwrap_or(3);

        parts[start..].join(" ")
    }
}

/// A token and the byte range of the input it was read from.
struct SourceToken {
    token: Token,
    start: usize,
    end: usize,
}

/// Maps tokenizer locations (1-based line and character column) to byte
/// offsets. Locations must be visited in increasing order.
struct SourceCursor<'a> {
    chars: CharIndices<'a>,
    len: usize,
    offset: usize,
    line: u64,
    column: u64,
}

impl<'a> SourceCursor<'a> {
    fn new(sql: &'a str) -> Self {
        Self {
            chars: sql.char_indices(),
            len: sql.len(),
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    fn seek(&mut self, location: Location) -> usize {
        while (self.line, self.column) < (location.line, location.column) {
            let Some((i, c)) = self.chars.next() else {
                self.offset = self.len;
                break;
            };
            self.offset = i + c.len_utf8();
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.offset
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Shorthand for [`SqlParser::alter_clause`].
pub fn alter_clause(sql: &str) -> String {
    SqlParser::new().alter_clause(sql)
}
