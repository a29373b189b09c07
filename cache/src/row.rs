use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;
use crate::value::Value;

/// The declared kind of one result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ColumnType {
  Long,
  Text,
  Bool,
  Bytes,
  /// Accepts any value unchanged.
  Any,
}

impl ColumnType {
  /// Converts `value` into the cached representation of this column.
  ///
  /// `Null` is accepted by every column.
  fn disassemble(self, column: usize, value: &Value) -> Result<Value, CacheError> {
    let accepted = match (self, value) {
      (_, Value::Null) | (ColumnType::Any, _) => true,
      (ColumnType::Long, Value::Int(_))
      | (ColumnType::Text, Value::Text(_))
      | (ColumnType::Bool, Value::Bool(_))
      | (ColumnType::Bytes, Value::Bytes(_)) => true,
      _ => false,
    };
    if accepted {
      Ok(value.clone())
    } else {
      Err(CacheError::ColumnMismatch {
        column,
        expected: self,
        found: value.kind(),
      })
    }
  }
}

impl fmt::Display for ColumnType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      ColumnType::Long => "long",
      ColumnType::Text => "text",
      ColumnType::Bool => "bool",
      ColumnType::Bytes => "bytes",
      ColumnType::Any => "any",
    };
    f.write_str(name)
  }
}

/// The arity and column kinds of every row of a cached query result.
#[derive(Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResultShape {
  columns: Arc<[ColumnType]>,
}

impl ResultShape {
  /// A single-column shape. Rows of this shape are cached as scalars.
  pub fn scalar(column: ColumnType) -> Self {
    Self {
      columns: Arc::from(vec![column]),
    }
  }

  /// A shape with the given columns.
  ///
  /// # Panics
  /// If `columns` is empty; every query returns at least one column.
  pub fn columns(columns: impl Into<Vec<ColumnType>>) -> Self {
    let columns = columns.into();
    assert!(!columns.is_empty(), "a result shape needs at least one column");
    Self {
      columns: Arc::from(columns),
    }
  }

  pub fn arity(&self) -> usize {
    self.columns.len()
  }

  pub fn column_types(&self) -> &[ColumnType] {
    &self.columns
  }

  /// Canonicalizes `row` into the form stored in a cached result list.
  ///
  /// A single-column shape yields [`CachedRow::Scalar`] and accepts either a
  /// scalar row or a one-element tuple. A wider shape yields
  /// [`CachedRow::Tuple`] and requires a tuple of matching arity.
  pub fn disassemble(&self, row: &ResultRow) -> Result<CachedRow, CacheError> {
    match (self.arity(), row) {
      (1, ResultRow::Scalar(value)) => Ok(CachedRow::Scalar(self.columns[0].disassemble(0, value)?)),
      (1, ResultRow::Tuple(values)) if values.len() == 1 => {
        Ok(CachedRow::Scalar(self.columns[0].disassemble(0, &values[0])?))
      }
      (arity, ResultRow::Tuple(values)) if arity == values.len() => {
        let values = self
          .columns
          .iter()
          .zip(values)
          .enumerate()
          .map(|(column, (ty, value))| ty.disassemble(column, value))
          .collect::<Result<Vec<_>, _>>()?;
        Ok(CachedRow::Tuple(values))
      }
      (arity, row) => Err(CacheError::ArityMismatch {
        expected: arity,
        found: row.arity(),
      }),
    }
  }
}

impl fmt::Debug for ResultShape {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_list().entries(self.columns.iter()).finish()
  }
}

/// A result row as produced by a query or a mapping callback.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResultRow {
  Scalar(Value),
  Tuple(Vec<Value>),
}

impl ResultRow {
  pub fn arity(&self) -> usize {
    match self {
      ResultRow::Scalar(_) => 1,
      ResultRow::Tuple(values) => values.len(),
    }
  }
}

impl From<Value> for ResultRow {
  fn from(value: Value) -> Self {
    ResultRow::Scalar(value)
  }
}

impl From<i64> for ResultRow {
  fn from(value: i64) -> Self {
    ResultRow::Scalar(Value::Int(value))
  }
}

impl From<&str> for ResultRow {
  fn from(value: &str) -> Self {
    ResultRow::Scalar(Value::from(value))
  }
}

impl From<String> for ResultRow {
  fn from(value: String) -> Self {
    ResultRow::Scalar(Value::Text(value))
  }
}

impl From<Vec<Value>> for ResultRow {
  fn from(values: Vec<Value>) -> Self {
    ResultRow::Tuple(values)
  }
}

/// One row of a cached result list, in canonical form.
///
/// Rows are compared by their canonical values: a scalar row by its single
/// value, a tuple row element-wise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CachedRow {
  Scalar(Value),
  Tuple(Vec<Value>),
}

impl CachedRow {
  pub fn as_scalar(&self) -> Option<&Value> {
    match self {
      CachedRow::Scalar(value) => Some(value),
      CachedRow::Tuple(_) => None,
    }
  }

  pub fn as_tuple(&self) -> Option<&[Value]> {
    match self {
      CachedRow::Tuple(values) => Some(values),
      CachedRow::Scalar(_) => None,
    }
  }
}

/// The ordered rows cached for one query key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CachedResultList {
  rows: Vec<CachedRow>,
}

impl CachedResultList {
  pub fn new(rows: Vec<CachedRow>) -> Self {
    Self { rows }
  }

  pub fn rows(&self) -> &[CachedRow] {
    &self.rows
  }

  pub fn into_rows(self) -> Vec<CachedRow> {
    self.rows
  }

  pub fn len(&self) -> usize {
    self.rows.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// The single result of a unique query, if any.
  pub fn unique(&self) -> Option<&CachedRow> {
    self.rows.first()
  }

  /// Scalar values of every row, skipping tuple rows.
  pub fn scalars(&self) -> impl Iterator<Item = &Value> {
    self.rows.iter().filter_map(CachedRow::as_scalar)
  }

  pub(crate) fn push(&mut self, row: CachedRow) {
    self.rows.push(row);
  }

  /// Removes the first row equal to `row`. Returns whether one was found.
  pub(crate) fn remove_first(&mut self, row: &CachedRow) -> bool {
    match self.rows.iter().position(|existing| existing == row) {
      Some(position) => {
        self.rows.remove(position);
        true
      }
      None => false,
    }
  }

  /// Drops every row, then keeps `row` as the only one if given.
  pub(crate) fn replace_unique(&mut self, row: Option<CachedRow>) {
    self.rows.clear();
    self.rows.extend(row);
  }
}
