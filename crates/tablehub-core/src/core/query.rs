// crates/tablehub-core/src/core/query.rs
// ============================================================================
// Module: Tablehub Query Model
// Description: Query shapes, filter operators, and tabular result sets.
// Purpose: Describe the small set of read queries the table engine accepts.
// Dependencies: base64, serde, thiserror, crate::core::identifiers
// ============================================================================

//! ## Overview
//! The table engine is not a general SQL engine. It accepts a [`QuerySpec`]
//! naming an optional table and one of two shapes: a full dump of every
//! column, or a two-column projection with at most one filter clause. Every
//! table and column in a query is a validated identifier, so a query cannot be
//! built from unvalidated input. Filter values remain plain strings and are
//! bound as parameters by the engine.
//!
//! [`RowSet`] is the engine's result. Its JSON form is the wire contract
//! shared with front-end consumers: `rows` is always an array, empty when no
//! rows match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::core::identifiers::ColumnName;
use crate::core::identifiers::IdentifierError;
use crate::core::identifiers::TableName;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Row cap applied to full dumps when no cap is supplied.
pub const DEFAULT_ROW_CAP: u32 = 10;
/// Hard row cap for two-column projections.
pub const PROJECTION_MAX_ROWS: u32 = 2500;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors raised while building a query from request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A table or column name failed validation.
    #[error(transparent)]
    Identifier(#[from] IdentifierError),
    /// The filter operator is not supported.
    #[error("unsupported filter operator: {0}")]
    UnsupportedOperator(String),
    /// A filter was supplied without its column.
    #[error("filter is missing a column")]
    MissingFilterColumn,
}

// ============================================================================
// SECTION: Filters
// ============================================================================

/// Comparison operator of a filter clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FilterOperator {
    /// `LIKE` pattern match.
    Like,
    /// `=` equality.
    Eq,
    /// `!=` inequality.
    NotEq,
    /// `<` less than.
    Lt,
    /// `<=` less than or equal.
    LtEq,
    /// `>` greater than.
    Gt,
    /// `>=` greater than or equal.
    GtEq,
}

impl FilterOperator {
    /// Parses an operator token. `LIKE` is matched case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::UnsupportedOperator`] for any other token.
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        match raw.trim() {
            "=" => Ok(Self::Eq),
            "!=" => Ok(Self::NotEq),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::LtEq),
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::GtEq),
            other if other.eq_ignore_ascii_case("like") => Ok(Self::Like),
            other => Err(QueryError::UnsupportedOperator(other.to_string())),
        }
    }

    /// Returns the SQL token for the operator.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Like => "LIKE",
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Single filter clause `column operator value`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilterClause {
    /// Column compared by the filter.
    pub column: ColumnName,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Literal value, always bound as a parameter.
    pub value: String,
}

// ============================================================================
// SECTION: Query Spec
// ============================================================================

/// Supported query shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryShape {
    /// Every column of the table in natural row order.
    FullDump,
    /// Two columns with an optional filter clause.
    Projection {
        /// First projected column.
        x: ColumnName,
        /// Second projected column.
        y: ColumnName,
        /// Optional filter clause.
        filter: Option<FilterClause>,
    },
}

/// Read query against one table of a stored database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuerySpec {
    /// Target table; the first table is used when absent.
    pub table: Option<TableName>,
    /// Query shape.
    pub shape: QueryShape,
    /// Requested row cap.
    pub row_cap: Option<u32>,
}

impl QuerySpec {
    /// Builds a full-dump query.
    #[must_use]
    pub const fn full_dump(table: Option<TableName>, row_cap: Option<u32>) -> Self {
        Self {
            table,
            shape: QueryShape::FullDump,
            row_cap,
        }
    }

    /// Builds a two-column projection query.
    #[must_use]
    pub const fn projection(
        table: Option<TableName>,
        x: ColumnName,
        y: ColumnName,
        filter: Option<FilterClause>,
    ) -> Self {
        Self {
            table,
            shape: QueryShape::Projection {
                x,
                y,
                filter,
            },
            row_cap: None,
        }
    }

    /// Returns the row cap the engine applies to this query.
    #[must_use]
    pub fn effective_row_cap(&self) -> u32 {
        match self.shape {
            QueryShape::FullDump => self.row_cap.unwrap_or(DEFAULT_ROW_CAP),
            QueryShape::Projection {
                ..
            } => self.row_cap.map_or(PROJECTION_MAX_ROWS, |cap| cap.min(PROJECTION_MAX_ROWS)),
        }
    }
}

/// Raw chart parameters as received from a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChartParams<'a> {
    /// First column name.
    pub x: &'a str,
    /// Second column name.
    pub y: &'a str,
    /// Filter column name, empty when unused.
    pub filter_column: &'a str,
    /// Filter operator, empty when unused.
    pub filter_operator: &'a str,
    /// Filter value, empty when unused.
    pub filter_value: &'a str,
}

impl ChartParams<'_> {
    /// Validates the parameters and builds a query shape.
    ///
    /// With neither column named the request falls back to a full dump of
    /// the table. A filter is applied only when both its operator and value
    /// are non-empty; a partially specified filter is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] when a column name or the operator is invalid.
    pub fn to_shape(&self) -> Result<QueryShape, QueryError> {
        if self.x.is_empty() && self.y.is_empty() {
            return Ok(QueryShape::FullDump);
        }
        let x = ColumnName::parse(self.x)?;
        let y = ColumnName::parse(self.y)?;
        let filter = if self.filter_operator.is_empty() || self.filter_value.is_empty() {
            None
        } else {
            if self.filter_column.is_empty() {
                return Err(QueryError::MissingFilterColumn);
            }
            Some(FilterClause {
                column: ColumnName::parse(self.filter_column)?,
                operator: FilterOperator::parse(self.filter_operator)?,
                value: self.filter_value.to_string(),
            })
        };
        Ok(QueryShape::Projection {
            x,
            y,
            filter,
        })
    }
}

// ============================================================================
// SECTION: Result Set
// ============================================================================

/// Value of a single cell as reported by the embedded engine.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// SQL NULL.
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl CellValue {
    /// Returns the storage class label of the value.
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Real(_) => "real",
            Self::Text(_) => "text",
            Self::Blob(_) => "blob",
        }
    }

    /// Renders the value as display text. Blobs are base64 encoded.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(value) => value.to_string(),
            Self::Real(value) => value.to_string(),
            Self::Text(value) => value.clone(),
            Self::Blob(bytes) => BASE64.encode(bytes),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Real(value) => serializer.serialize_f64(*value),
            Self::Text(value) => serializer.serialize_str(value),
            Self::Blob(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
        }
    }
}

/// Named cell within a row.
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    /// Column name.
    pub name: String,
    /// Cell value.
    pub value: CellValue,
}

impl Serialize for Cell {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Cell", 3)?;
        state.serialize_field("name", &self.name)?;
        state.serialize_field("type", self.value.type_label())?;
        state.serialize_field("value", &self.value)?;
        state.end()
    }
}

/// Ordered cells of one row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row(pub Vec<Cell>);

/// Result of a table query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowSet {
    /// Table the rows were read from.
    pub table: String,
    /// Every table in the database, sorted by name.
    pub tables: Vec<String>,
    /// Column names in result order.
    #[serde(skip)]
    pub columns: Vec<String>,
    /// Returned rows.
    pub rows: Vec<Row>,
    /// Number of returned rows.
    pub row_count: u64,
    /// Number of rows in the table.
    pub total_rows: u64,
}

impl RowSet {
    /// Serializes the row set to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] when serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn operators_cover_the_supported_set() {
        for (raw, sql) in
            [("like", "LIKE"), ("LIKE", "LIKE"), ("=", "="), ("!=", "!="), ("<=", "<="), (">", ">")]
        {
            assert_eq!(FilterOperator::parse(raw).unwrap().as_sql(), sql);
        }
        assert!(matches!(
            FilterOperator::parse("; DROP"),
            Err(QueryError::UnsupportedOperator(_))
        ));
        assert!(FilterOperator::parse("<>").is_err());
    }

    #[test]
    fn partial_filters_are_ignored() {
        let params = ChartParams {
            x: "year",
            y: "sales",
            filter_column: "region",
            filter_operator: "=",
            filter_value: "",
        };
        let shape = params.to_shape().unwrap();
        assert!(matches!(shape, QueryShape::Projection { filter: None, .. }));
    }

    #[test]
    fn chart_without_columns_is_a_full_dump() {
        assert_eq!(ChartParams::default().to_shape().unwrap(), QueryShape::FullDump);
        let half = ChartParams {
            y: "sales",
            ..ChartParams::default()
        };
        assert!(matches!(half.to_shape(), Err(QueryError::Identifier(_))));
    }

    #[test]
    fn projection_cap_never_exceeds_maximum() {
        let x = ColumnName::parse("a").unwrap();
        let y = ColumnName::parse("b").unwrap();
        let mut spec = QuerySpec::projection(None, x, y, None);
        assert_eq!(spec.effective_row_cap(), PROJECTION_MAX_ROWS);
        spec.row_cap = Some(10_000);
        assert_eq!(spec.effective_row_cap(), PROJECTION_MAX_ROWS);
        spec.row_cap = Some(5);
        assert_eq!(spec.effective_row_cap(), 5);
        assert_eq!(QuerySpec::full_dump(None, None).effective_row_cap(), DEFAULT_ROW_CAP);
    }

    #[test]
    fn empty_row_set_serializes_rows_as_array() {
        let rows = RowSet {
            table: "t".to_string(),
            tables: vec!["t".to_string()],
            columns: vec!["a".to_string()],
            rows: Vec::new(),
            row_count: 0,
            total_rows: 7,
        };
        let value: serde_json::Value = serde_json::from_slice(&rows.to_json_bytes().unwrap()).unwrap();
        assert_eq!(
            value,
            json!({"table": "t", "tables": ["t"], "rows": [], "rowCount": 0, "totalRows": 7})
        );
    }

    #[test]
    fn cells_carry_native_types() {
        let row = Row(vec![
            Cell {
                name: "n".to_string(),
                value: CellValue::Integer(3),
            },
            Cell {
                name: "b".to_string(),
                value: CellValue::Blob(vec![0, 1, 2]),
            },
            Cell {
                name: "z".to_string(),
                value: CellValue::Null,
            },
        ]);
        let value = serde_json::to_value(&row).unwrap();
        assert_eq!(
            value,
            json!([
                {"name": "n", "type": "integer", "value": 3},
                {"name": "b", "type": "blob", "value": "AAEC"},
                {"name": "z", "type": "null", "value": null}
            ])
        );
    }
}
