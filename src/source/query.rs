//! Query parameter building
//!
//! Turns the user's predicate, sort, field list and page size into the
//! canonical parameter set sent with every page request.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::QueryError;

/// Sort direction of one clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `field asc|desc` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortClause {
    pub field: String,
    pub direction: SortDirection,
}

/// Parsed sort specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    clauses: Vec<SortClause>,
}

impl SortSpec {
    /// Parse a comma-separated list of `field asc|desc` clauses
    ///
    /// A field may be a function such as `div(popularity,price)`; commas and
    /// spaces inside its parentheses do not split clauses.
    pub fn parse(sort: &str) -> Result<Self, QueryError> {
        let mut clauses = Vec::new();

        for raw in split_top_level(sort, |c| c == ',') {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let (field, direction) = match raw.rsplit_once(char::is_whitespace) {
                Some((field, dir)) => (field.trim_end(), dir),
                None => {
                    return Err(QueryError::InvalidSort(format!(
                        "missing direction for \"{raw}\""
                    )));
                }
            };
            if split_top_level(field, char::is_whitespace).len() > 1 {
                return Err(QueryError::InvalidSort(format!(
                    "expected \"field asc|desc\", got \"{raw}\""
                )));
            }

            let direction = match direction.to_ascii_lowercase().as_str() {
                "asc" => SortDirection::Asc,
                "desc" => SortDirection::Desc,
                other => {
                    return Err(QueryError::InvalidSort(format!(
                        "unknown direction \"{other}\" for \"{field}\""
                    )));
                }
            };

            clauses.push(SortClause {
                field: field.to_string(),
                direction,
            });
        }

        if clauses.is_empty() {
            return Err(QueryError::InvalidSort("sort is empty".to_string()));
        }

        Ok(Self { clauses })
    }

    pub fn clauses(&self) -> &[SortClause] {
        &self.clauses
    }

    /// Whether any clause sorts on `field`
    pub fn references(&self, field: &str) -> bool {
        self.clauses.iter().any(|c| c.field == field)
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            let dir = match clause.direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            write!(f, "{} {}", clause.field, dir)?;
        }
        Ok(())
    }
}

/// Split `s` at every character matching `sep` outside parentheses
fn split_top_level(s: &str, sep: impl Fn(char) -> bool) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && sep(c) => {
                parts.push(&s[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}

/// User-supplied query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Query predicate, `*:*` for everything
    pub query: String,

    /// Sort; must include the collection's unique key
    pub sort: SortSpec,

    /// Requested fields; empty means all fields
    pub fields: Vec<String>,

    /// Documents per page
    pub rows: u32,
}

impl QuerySpec {
    pub fn new(query: impl Into<String>, sort: SortSpec, fields: Vec<String>, rows: u32) -> Self {
        Self {
            query: query.into(),
            sort,
            fields,
            rows,
        }
    }
}

/// Split a field list on commas and whitespace
///
/// A list with no names left after splitting (e.g. `" , "`) is empty and so
/// requests all fields.
pub fn parse_field_list(fields: &str) -> Vec<String> {
    fields
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical, key-ordered query parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<&'static str, String>);

impl QueryParams {
    /// Build the parameter set for a query
    pub fn from_spec(spec: &QuerySpec) -> Self {
        let mut params = BTreeMap::new();
        params.insert("q", spec.query.clone());
        params.insert("sort", spec.sort.to_string());
        if !spec.fields.is_empty() {
            params.insert("fl", spec.fields.join(","));
        }
        params.insert("rows", spec.rows.to_string());
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parameters as `(key, value)` pairs in key order
    pub fn pairs(&self) -> Vec<(&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }
}
