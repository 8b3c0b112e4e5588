//! Filter types for dynamic query building.
//!
//! A [`FilterSpec`] is a declarative, immutable description of which rows a
//! list query should return and in what order: per-field predicates (AND),
//! an optional compound search term (OR across the table's search columns),
//! optional inclusive date bounds and an ordered sort.
//!
//! Storage backends translate a spec into their own query language; the
//! in-memory backend evaluates it with [`FilterSpec::matches`].

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::pagination::{PAGE_PARAM, SIZE_PARAM};
use super::sorting::SortField;
use super::value::{ColumnKind, FieldValue, Record};
use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::Table;

/// Query-string key for the compound search term.
pub const SEARCH_PARAM: &str = "search";
/// Query-string key for the inclusive lower date bound.
pub const DATE_FROM_PARAM: &str = "date_from";
/// Query-string key for the inclusive upper date bound.
pub const DATE_TO_PARAM: &str = "date_to";
/// Query-string key for the sort order.
pub const ORDER_BY_PARAM: &str = "order_by";
/// Separator between a field name and an operator suffix.
pub const OP_SEPARATOR: &str = "__";

/// Filter comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL `LIKE` pattern match.
    Like,
    /// SQL `ILIKE` case-insensitive pattern match.
    ILike,
    /// SQL `IN` list membership.
    In,
    /// SQL `NOT IN` list exclusion.
    NotIn,
    /// SQL `IS NULL` check.
    IsNull,
    /// SQL `IS NOT NULL` check.
    IsNotNull,
    /// SQL `IS DISTINCT FROM`: not equal, with `NULL` treated as a value.
    IsNot,
}

impl FilterOp {
    /// Operator named by a `field__<suffix>` query key.
    ///
    /// `isnull` maps to [`FilterOp::IsNull`]; its boolean value decides
    /// between `IS NULL` and `IS NOT NULL` during parsing. `not` maps to
    /// [`FilterOp::IsNot`].
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "eq" => Self::Eq,
            "neq" | "ne" => Self::Ne,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "like" => Self::Like,
            "ilike" => Self::ILike,
            "in" => Self::In,
            "not_in" => Self::NotIn,
            "isnull" => Self::IsNull,
            "not" => Self::IsNot,
            _ => return None,
        })
    }

    /// Return the SQL operator for binary comparisons.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::ILike => "ILIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::IsNot => "IS DISTINCT FROM",
        }
    }
}

/// The operand of a filter condition.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// A single value.
    Single(FieldValue),
    /// A list of values (for `IN` / `NOT IN`).
    List(Vec<FieldValue>),
    /// No operand (for `IS NULL` / `IS NOT NULL`).
    None,
}

/// A single filter condition on a named field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterField {
    /// The column to filter on.
    pub field: String,
    /// The comparison operator.
    pub op: FilterOp,
    /// The value to compare against.
    pub value: FilterValue,
}

impl FilterField {
    /// Create a new filter field.
    pub fn new(field: impl Into<String>, op: FilterOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    /// Shorthand for an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::new(field, FilterOp::Eq, FilterValue::Single(value.into()))
    }

    /// Shorthand for a case-insensitive LIKE filter.
    pub fn ilike(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(
            field,
            FilterOp::ILike,
            FilterValue::Single(FieldValue::Text(pattern.into())),
        )
    }

    /// Shorthand for list membership.
    pub fn one_of<V: Into<FieldValue>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self::new(
            field,
            FilterOp::In,
            FilterValue::List(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Shorthand for a null check.
    pub fn is_null(field: impl Into<String>, null: bool) -> Self {
        let op = if null { FilterOp::IsNull } else { FilterOp::IsNotNull };
        Self::new(field, op, FilterValue::None)
    }

    /// Evaluate the condition against a row with SQL semantics: a `NULL`
    /// column only satisfies `IS NULL`.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(&self.field).unwrap_or(&FieldValue::Null);
        let equal = |v: &FieldValue| actual.compare(v) == Some(Ordering::Equal);

        match (self.op, &self.value) {
            (FilterOp::IsNull, _) => actual.is_null(),
            (FilterOp::IsNotNull, _) => !actual.is_null(),
            (FilterOp::In, FilterValue::List(values)) => values.iter().any(equal),
            (FilterOp::NotIn, FilterValue::List(values)) => {
                !actual.is_null() && !values.iter().any(equal)
            }
            (FilterOp::Like | FilterOp::ILike, FilterValue::Single(FieldValue::Text(pattern))) => {
                actual
                    .as_text()
                    .is_some_and(|s| like_match(s, pattern, self.op == FilterOp::ILike))
            }
            (FilterOp::IsNot, FilterValue::Single(expected)) => {
                match (actual.is_null(), expected.is_null()) {
                    (true, true) => false,
                    (false, false) => !equal(expected),
                    _ => true,
                }
            }
            (op, FilterValue::Single(expected)) => match actual.compare(expected) {
                Some(ord) => match op {
                    FilterOp::Eq => ord == Ordering::Equal,
                    FilterOp::Ne => ord != Ordering::Equal,
                    FilterOp::Gt => ord == Ordering::Greater,
                    FilterOp::Gte => ord != Ordering::Less,
                    FilterOp::Lt => ord == Ordering::Less,
                    FilterOp::Lte => ord != Ordering::Greater,
                    _ => false,
                },
                None => false,
            },
            _ => false,
        }
    }

    fn validate(&self, table: &Table) -> AppResult<()> {
        let column = table.require_column(&self.field)?;
        let shape_ok = match self.op {
            FilterOp::IsNull | FilterOp::IsNotNull => true,
            FilterOp::In | FilterOp::NotIn => matches!(self.value, FilterValue::List(_)),
            FilterOp::Like | FilterOp::ILike => {
                column.kind == ColumnKind::Text
                    && matches!(self.value, FilterValue::Single(FieldValue::Text(_)))
            }
            _ => matches!(self.value, FilterValue::Single(_)),
        };
        if shape_ok {
            Ok(())
        } else {
            Err(AppError::validation(format!(
                "Operator '{}' cannot be applied to '{}'",
                self.op.as_sql(),
                self.field
            )))
        }
    }
}

/// Compound case-insensitive substring search across several columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    /// The raw term; matched as a substring, never as a pattern.
    pub term: String,
    /// Columns the term is matched against (OR).
    pub fields: Vec<String>,
}

impl SearchTerm {
    /// Whether any of the search columns contains the term.
    pub fn matches(&self, record: &Record) -> bool {
        let needle = self.term.to_lowercase();
        self.fields.iter().any(|field| {
            record
                .get(field)
                .and_then(FieldValue::as_text)
                .is_some_and(|s| s.to_lowercase().contains(&needle))
        })
    }
}

/// Inclusive bounds on a timestamp column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    /// The constrained column.
    pub field: String,
    /// Inclusive lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// Whether the row's column lies within the bounds.
    pub fn matches(&self, record: &Record) -> bool {
        let Some(FieldValue::Timestamp(at)) = record.get(&self.field) else {
            return false;
        };
        self.from.is_none_or(|from| *at >= from) && self.to.is_none_or(|to| *at <= to)
    }
}

/// A declarative list query: predicates, search, date bounds and sort.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    fields: Vec<FilterField>,
    search: Option<SearchTerm>,
    date_range: Option<DateRange>,
    sort: Vec<SortField>,
}

impl FilterSpec {
    /// An empty spec: no constraint, storage order.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a predicate.
    pub fn with(mut self, field: FilterField) -> Self {
        self.fields.push(field);
        self
    }

    /// Set the compound search term.
    pub fn search<S: Into<String>>(
        mut self,
        term: impl Into<String>,
        fields: impl IntoIterator<Item = S>,
    ) -> Self {
        self.search = Some(SearchTerm {
            term: term.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set inclusive date bounds on a column.
    pub fn date_range(
        mut self,
        field: impl Into<String>,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Self {
        self.date_range = Some(DateRange {
            field: field.into(),
            from,
            to,
        });
        self
    }

    /// Append a sort key.
    pub fn order_by(mut self, sort: SortField) -> Self {
        self.sort.push(sort);
        self
    }

    /// The per-field predicates.
    pub fn fields(&self) -> &[FilterField] {
        &self.fields
    }

    /// The compound search term, if any.
    pub fn search_term(&self) -> Option<&SearchTerm> {
        self.search.as_ref()
    }

    /// The date bounds, if any.
    pub fn date_bounds(&self) -> Option<&DateRange> {
        self.date_range.as_ref()
    }

    /// The requested sort, in declared order.
    pub fn sort(&self) -> &[SortField] {
        &self.sort
    }

    /// Check every referenced column against the table.
    pub fn validate(&self, table: &Table) -> AppResult<()> {
        for field in &self.fields {
            field.validate(table)?;
        }
        if let Some(search) = &self.search {
            for field in &search.fields {
                table.require_column(field)?;
            }
        }
        if let Some(range) = &self.date_range {
            let column = table.require_column(&range.field)?;
            if column.kind != ColumnKind::Timestamp {
                return Err(AppError::validation(format!(
                    "'{}' is not a date field",
                    range.field
                )));
            }
        }
        for sort in &self.sort {
            table.require_column(&sort.field)?;
        }
        Ok(())
    }

    /// Evaluate the predicates, search term and date bounds against a row.
    pub fn matches(&self, record: &Record) -> bool {
        self.fields.iter().all(|f| f.matches(record))
            && self.search.as_ref().is_none_or(|s| s.matches(record))
            && self.date_range.as_ref().is_none_or(|d| d.matches(record))
    }

    /// Build a spec from query-string pairs.
    ///
    /// Recognised keys are `search`, `date_from`, `date_to`, `order_by`,
    /// `<column>` (equality) and `<column>__<op>`. The paging keys are
    /// skipped. Every value is parsed according to its column's kind.
    pub fn from_query(table: &Table, pairs: &[(String, String)]) -> AppResult<Self> {
        let mut spec = Self::new();
        let mut date_from = None;
        let mut date_to = None;

        for (key, raw) in pairs {
            match key.as_str() {
                PAGE_PARAM | SIZE_PARAM => {}
                SEARCH_PARAM => {
                    let term = raw.trim();
                    if term.is_empty() {
                        continue;
                    }
                    if table.search_columns.is_empty() {
                        return Err(AppError::validation(format!(
                            "{} does not support search",
                            table.entity_name
                        )));
                    }
                    spec = spec.search(term, table.search_columns.iter().copied());
                }
                DATE_FROM_PARAM => date_from = Some(parse_date_bound(raw, false)?),
                DATE_TO_PARAM => date_to = Some(parse_date_bound(raw, true)?),
                ORDER_BY_PARAM => {
                    for sort in SortField::parse_list(raw) {
                        spec = spec.order_by(sort);
                    }
                }
                _ => spec = spec.with(parse_condition(table, key, raw)?),
            }
        }

        if date_from.is_some() || date_to.is_some() {
            let column = table.date_column.ok_or_else(|| {
                AppError::validation(format!(
                    "{} does not support date ranges",
                    table.entity_name
                ))
            })?;
            spec = spec.date_range(column, date_from, date_to);
        }

        spec.validate(table)?;
        Ok(spec)
    }
}

fn parse_condition(table: &Table, key: &str, raw: &str) -> AppResult<FilterField> {
    let (field, op) = match key.rsplit_once(OP_SEPARATOR) {
        Some((field, suffix)) => {
            let op = FilterOp::from_suffix(suffix).ok_or_else(|| {
                AppError::validation(format!("Unknown filter operator '{suffix}'"))
            })?;
            (field, op)
        }
        None => (key, FilterOp::Eq),
    };
    let column = table.require_column(field)?;

    Ok(match op {
        FilterOp::IsNull => {
            let FieldValue::Bool(null) = FieldValue::parse(ColumnKind::Bool, raw)? else {
                return Err(AppError::validation(format!("'{key}' expects true or false")));
            };
            FilterField::is_null(field, null)
        }
        FilterOp::In | FilterOp::NotIn => {
            let values = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| FieldValue::parse(column.kind, s))
                .collect::<AppResult<Vec<_>>>()?;
            FilterField::new(field, op, FilterValue::List(values))
        }
        FilterOp::Like | FilterOp::ILike => {
            FilterField::new(field, op, FilterValue::Single(FieldValue::Text(format!("%{raw}%"))))
        }
        _ => FilterField::new(field, op, FilterValue::Single(FieldValue::parse(column.kind, raw)?)),
    })
}

/// Parse a date bound. A bare `YYYY-MM-DD` upper bound covers the whole day.
fn parse_date_bound(raw: &str, upper: bool) -> AppResult<DateTime<Utc>> {
    let raw = raw.trim();
    let FieldValue::Timestamp(at) = FieldValue::parse(ColumnKind::Timestamp, raw)? else {
        return Err(AppError::validation(format!("'{raw}' is not a valid date")));
    };
    let bare_date = !raw.contains('T') && !raw.contains(' ');
    if upper && bare_date {
        Ok(at + Duration::days(1) - Duration::microseconds(1))
    } else {
        Ok(at)
    }
}

/// SQL `LIKE` matching: `%` matches any run, `_` a single character,
/// `\` escapes the next character.
pub fn like_match(value: &str, pattern: &str, case_insensitive: bool) -> bool {
    let fold = |s: &str| -> Vec<char> {
        if case_insensitive {
            s.to_lowercase().chars().collect()
        } else {
            s.chars().collect()
        }
    };
    let text = fold(value);
    let pat = fold(pattern);

    // Backtracking matcher over the last `%` seen.
    let (mut t, mut p) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while t < text.len() {
        match pat.get(p) {
            Some('%') => {
                star = Some((p, t));
                p += 1;
                continue;
            }
            Some('\\') if pat.get(p + 1) == Some(&text[t]) => {
                t += 1;
                p += 2;
                continue;
            }
            Some('_') => {
                t += 1;
                p += 1;
                continue;
            }
            Some(c) if *c != '\\' && *c == text[t] => {
                t += 1;
                p += 1;
                continue;
            }
            _ => {}
        }
        match star {
            Some((sp, st)) => {
                p = sp + 1;
                t = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }
    pat[p..].iter().all(|c| *c == '%')
}
