//! Display-only statement rendering.
//!
//! Output of this module is informational. It is shown in diagnostics and
//! logs and is never sent to the server.

use sqlformat::{FormatOptions, Indent, QueryParams};

use crate::models::enums::SqlParam;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundSql {
    pub text: String,
    /// Positional placeholders found outside quoted literals.
    pub placeholders: usize,
    /// Placeholders replaced by a literal; extras beyond `params` stay `?`.
    pub substituted: usize,
    /// Parameters supplied for the statement.
    pub params: usize,
}

impl BoundSql {
    /// Render `sql` with each `?` replaced, in order, by the literal form of
    /// the matching parameter.
    pub fn render(sql: &str, params: &[SqlParam]) -> Self {
        let mut text = String::with_capacity(sql.len() + params.len() * 8);
        let mut placeholders = 0usize;
        let mut substituted = 0usize;
        let mut quote: Option<char> = None;
        let mut chars = sql.chars().peekable();

        while let Some(c) = chars.next() {
            match quote {
                Some(q) => {
                    text.push(c);
                    if c == '\\' && q != '`' {
                        if let Some(next) = chars.next() {
                            text.push(next);
                        }
                    } else if c == q {
                        // doubled quote stays inside the literal
                        if chars.peek() == Some(&q) {
                            if let Some(next) = chars.next() {
                                text.push(next);
                            }
                        } else {
                            quote = None;
                        }
                    }
                }
                None => match c {
                    '\'' | '"' | '`' => {
                        quote = Some(c);
                        text.push(c);
                    }
                    '?' => {
                        match params.get(placeholders) {
                            Some(p) => {
                                text.push_str(&sql_literal(p));
                                substituted += 1;
                            }
                            None => text.push('?'),
                        }
                        placeholders += 1;
                    }
                    _ => text.push(c),
                },
            }
        }

        Self {
            text,
            placeholders,
            substituted,
            params: params.len(),
        }
    }

    /// Every placeholder has a parameter and every parameter a placeholder.
    pub fn is_fully_bound(&self) -> bool {
        self.placeholders == self.params && self.substituted == self.placeholders
    }

    /// Reformatted copy of the bound text for multi-line display.
    pub fn pretty(&self) -> String {
        sqlformat::format(&self.text, &QueryParams::None, &display_format_options())
    }
}

/// Literal form of a parameter: strings quoted with embedded quotes doubled,
/// numbers bare, absent values as `NULL`.
pub fn sql_literal(param: &SqlParam) -> String {
    match param {
        SqlParam::Null => "NULL".to_string(),
        SqlParam::Int(v) => v.to_string(),
        SqlParam::Float(v) if v.is_finite() => v.to_string(),
        SqlParam::Float(_) => "NULL".to_string(),
        SqlParam::Bool(true) => "TRUE".to_string(),
        SqlParam::Bool(false) => "FALSE".to_string(),
        SqlParam::Text(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''")),
    }
}

fn display_format_options() -> FormatOptions<'static> {
    FormatOptions {
        joins_as_top_level: true,
        indent: Indent::Spaces(2),
        uppercase: Some(true),
        lines_between_queries: 1,
        ..Default::default()
    }
}
