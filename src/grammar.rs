//! Declarative command/response grammar.
//!
//! A device screen is fully described as data: the literal request text
//! plus an ordered set of named field-extraction rules. Adding a screen
//! means writing a new [`CommandSpec`] value, never new parsing code.
//! Specs are immutable once built; every parse allocates a fresh result
//! buffer, so one spec value can serve any number of replies.
//!
//! Extraction never fails: a field whose pattern does not match yields
//! [`ABSENT_MARKER`] and parsing of the remaining fields continues.

use regex::Regex;

use crate::error::EngineError;
use crate::session::CommandExchange;

/// Canonical placeholder for a field with no match.
///
/// Report consumers rely on this being a visible literal rather than an
/// empty cell, so unmatched fields cannot be confused with empty values.
pub const ABSENT_MARKER: &str = "-";

/// Post-extraction value transform, applied only to successful matches.
pub type FieldTransform = fn(&str) -> String;

/// One named column of a screen's output.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    pattern: Option<Regex>,
    literal: Option<String>,
    transform: Option<FieldTransform>,
}

impl FieldSpec {
    /// Column name, used in the report header.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, reply: &str) -> String {
        if let Some(value) = &self.literal {
            return value.clone();
        }
        let Some(pattern) = &self.pattern else {
            return ABSENT_MARKER.to_string();
        };
        match pattern.captures(reply).and_then(|caps| caps.get(1)) {
            Some(group) => {
                let cleaned = clean_capture(group.as_str());
                match self.transform {
                    Some(transform) => transform(&cleaned),
                    None => cleaned,
                }
            }
            None => ABSENT_MARKER.to_string(),
        }
    }
}

/// Strip surrounding whitespace and thousands separators from a capture.
pub fn clean_capture(raw: &str) -> String {
    raw.trim().replace(',', "")
}

/// One device "show" screen: request text plus ordered field rules.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    text: String,
    fields: Vec<FieldSpec>,
    reverse_reply: bool,
}

impl CommandSpec {
    /// Start building a spec for one request line.
    pub fn builder(text: impl Into<String>) -> CommandSpecBuilder {
        CommandSpecBuilder {
            text: text.into(),
            multiline: false,
            reverse_reply: false,
            fields: Vec::new(),
        }
    }

    /// The literal request text sent to the unit.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name())
    }

    /// Number of columns this screen contributes.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    /// Evaluate every field rule against a captured reply.
    ///
    /// Returns exactly one value per field, in declaration order.
    pub fn parse_reply(&self, reply: &str) -> Vec<String> {
        let text = if self.reverse_reply {
            let mut lines: Vec<&str> = reply.split("\r\n").collect();
            lines.reverse();
            lines.join("\r\n")
        } else {
            reply.to_string()
        };

        self.fields.iter().map(|field| field.extract(&text)).collect()
    }

    /// Send the request through a session and parse the reply.
    pub async fn run<E: CommandExchange>(&self, session: &mut E) -> Result<Vec<String>, EngineError> {
        let reply = session.send_command(&self.text).await?;
        Ok(self.parse_reply(&reply))
    }
}

enum FieldRule {
    Pattern(String, Option<FieldTransform>),
    Literal(String),
}

/// Builder assembling a [`CommandSpec`]; patterns compile at `build`.
pub struct CommandSpecBuilder {
    text: String,
    multiline: bool,
    reverse_reply: bool,
    fields: Vec<(String, FieldRule)>,
}

impl CommandSpecBuilder {
    /// Compile patterns so `^`/`$` match at line boundaries.
    pub fn multiline(mut self) -> Self {
        self.multiline = true;
        self
    }

    /// Reverse the reply's line order before matching.
    ///
    /// Used for append-only screens such as event logs, so the newest
    /// entries are matched first.
    pub fn reversed(mut self) -> Self {
        self.reverse_reply = true;
        self
    }

    /// Add a pattern-extracted field; group 1 is the captured value.
    pub fn field(mut self, name: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.fields
            .push((name.into(), FieldRule::Pattern(pattern.into(), None)));
        self
    }

    /// Add a pattern-extracted field with a value transform.
    pub fn field_with(
        mut self,
        name: impl Into<String>,
        pattern: impl Into<String>,
        transform: FieldTransform,
    ) -> Self {
        self.fields
            .push((name.into(), FieldRule::Pattern(pattern.into(), Some(transform))));
        self
    }

    /// Add a fixed-value field (for example a bank or slot index).
    pub fn literal(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields
            .push((name.into(), FieldRule::Literal(value.into())));
        self
    }

    /// Compile every field pattern and produce the immutable spec.
    pub fn build(self) -> Result<CommandSpec, EngineError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for (name, rule) in self.fields {
            let field = match rule {
                FieldRule::Literal(value) => FieldSpec {
                    name,
                    pattern: None,
                    literal: Some(value),
                    transform: None,
                },
                FieldRule::Pattern(raw, transform) => {
                    let pattern = compile_pattern(&self.text, &name, &raw, self.multiline)?;
                    FieldSpec {
                        name,
                        pattern: Some(pattern),
                        literal: None,
                        transform,
                    }
                }
            };
            fields.push(field);
        }

        Ok(CommandSpec {
            text: self.text,
            fields,
            reverse_reply: self.reverse_reply,
        })
    }
}

fn compile_pattern(
    screen: &str,
    field: &str,
    raw: &str,
    multiline: bool,
) -> Result<Regex, EngineError> {
    let source = if multiline {
        format!("(?m){raw}")
    } else {
        raw.to_string()
    };
    Regex::new(&source).map_err(|err| {
        EngineError::InvalidScreen(format!(
            "screen '{screen}' field '{field}': invalid pattern: {err}"
        ))
    })
}

/// One matched row of a tabular screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRow {
    /// Row index the pattern was anchored on.
    pub index: usize,
    /// Column values in the table's declared order.
    pub cells: Vec<String>,
}

/// A tabular screen with a fixed number of index-anchored rows.
///
/// Screens backed by ring buffers report at most `N` rows, one per known
/// index; indexes the buffer has not populated yet simply fail to match
/// and are omitted, so the assembled table may be shorter than `N`.
#[derive(Debug, Clone)]
pub struct TableSpec {
    text: String,
    rows: Vec<Regex>,
    columns: Regex,
    column_names: Vec<String>,
}

impl TableSpec {
    /// Build a table over `row_count` indexes.
    ///
    /// `row_pattern` yields the anchored pattern for each index with the
    /// full row as group 1; `columns_pattern` splits a matched row into
    /// one group per column name.
    pub fn new(
        text: impl Into<String>,
        row_count: usize,
        row_pattern: impl Fn(usize) -> String,
        columns_pattern: &str,
        column_names: &[&str],
    ) -> Result<Self, EngineError> {
        let text = text.into();
        let mut rows = Vec::with_capacity(row_count);
        for index in 0..row_count {
            let raw = row_pattern(index);
            rows.push(compile_pattern(&text, &format!("row_{index}"), &raw, true)?);
        }
        let columns = compile_pattern(&text, "columns", columns_pattern, false)?;
        Ok(Self {
            text,
            rows,
            columns,
            column_names: column_names.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// The literal request text sent to the unit.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Declared column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Maximum number of rows this table can report.
    pub fn max_rows(&self) -> usize {
        self.rows.len()
    }

    /// Match every row index against the reply, in index order.
    pub fn parse_reply(&self, reply: &str) -> Vec<TableRow> {
        let mut out = Vec::new();
        for (index, pattern) in self.rows.iter().enumerate() {
            let Some(row_text) = pattern
                .captures(reply)
                .and_then(|caps| caps.get(1))
                .map(|group| group.as_str())
            else {
                continue;
            };
            let Some(caps) = self.columns.captures(row_text) else {
                continue;
            };
            let cells = (1..=self.column_names.len())
                .map(|i| {
                    caps.get(i)
                        .map(|g| clean_capture(g.as_str()))
                        .unwrap_or_else(|| ABSENT_MARKER.to_string())
                })
                .collect();
            out.push(TableRow { index, cells });
        }
        out
    }

    /// Send the request through a session and parse the reply.
    pub async fn run<E: CommandExchange>(
        &self,
        session: &mut E,
    ) -> Result<Vec<TableRow>, EngineError> {
        let reply = session.send_command(&self.text).await?;
        Ok(self.parse_reply(&reply))
    }
}
