//! Server-side `$filter` expressions.
//!
//! The directory accepts one filterable field per request, so only
//! single-field equality is built here.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    DisplayName(String),
    Subject(String),
}

impl Filter {
    pub fn display_name(value: impl Into<String>) -> Self {
        Filter::DisplayName(value.into())
    }

    pub fn subject(value: impl Into<String>) -> Self {
        Filter::Subject(value.into())
    }

    fn field(&self) -> &'static str {
        match self {
            Filter::DisplayName(_) => "displayName",
            Filter::Subject(_) => "subject",
        }
    }

    fn value(&self) -> &str {
        match self {
            Filter::DisplayName(v) | Filter::Subject(v) => v,
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} eq {}", self.field(), quote(self.value()))
    }
}

/// Single-quoted string literal; embedded quotes are doubled.
fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
