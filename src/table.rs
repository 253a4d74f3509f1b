use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

use crate::error::{AreaError, InputKind, Result};

/// Column holding the raster class code.
pub const VALUE_COLUMN: &str = "Value";

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Cell::Empty,
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => Cell::Float(*f),
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Float(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        }
    }
}

/// Land-cover class lookup: one row per class code, descriptive columns kept as read.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
    codes: Vec<i32>,
}

impl ClassificationTable {
    /// Reads the table from a spreadsheet (xls, xlsx, xlsb, ods). The first row is the header.
    pub fn from_path(path: &Path, sheet: Option<&str>) -> Result<Self> {
        let not_found = |reason: String| AreaError::InputNotFound {
            input: InputKind::ClassificationTable,
            path: path.to_path_buf(),
            reason,
        };

        let mut workbook = open_workbook_auto(path).map_err(|e| not_found(e.to_string()))?;

        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| not_found("workbook contains no sheets".to_string()))?,
        };

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| not_found(format!("sheet `{}`: {}", sheet_name, e)))?;

        let mut rows = range.rows();
        let columns: Vec<String> = rows
            .next()
            .map(|header| header.iter().map(header_name).collect())
            .unwrap_or_default();
        let rows = rows
            .map(|row| row.iter().map(Cell::from).collect())
            .collect();

        let table = Self::from_rows(columns, rows)?;
        tracing::info!(
            "Loaded classification table {:?} (sheet `{}`): {} classes",
            path,
            sheet_name,
            table.len()
        );
        Ok(table)
    }

    /// Builds the table from already-parsed rows, dropping rows whose `Value` is empty.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self> {
        let value_idx = columns
            .iter()
            .position(|c| c == VALUE_COLUMN)
            .ok_or_else(|| AreaError::MissingRequiredColumn {
                input: InputKind::ClassificationTable,
                column: VALUE_COLUMN.to_string(),
            })?;

        let mut kept = Vec::with_capacity(rows.len());
        let mut codes = Vec::with_capacity(rows.len());

        for (i, mut row) in rows.into_iter().enumerate() {
            // 列数が足りない行は空セルで埋める
            row.resize(columns.len(), Cell::Empty);

            match class_code(&row[value_idx], i + 1)? {
                Some(code) => {
                    codes.push(code);
                    kept.push(row);
                }
                None => tracing::debug!("Dropping classification row {} without a class code", i + 1),
            }
        }

        Ok(Self {
            columns,
            rows: kept,
            codes,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Class codes in row order.
    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn header_name(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn class_code(cell: &Cell, row: usize) -> Result<Option<i32>> {
    let invalid = |value: String| AreaError::InvalidClassCode { row, value };

    match cell {
        Cell::Empty => Ok(None),
        Cell::Int(i) => i32::try_from(*i).map(Some).map_err(|_| invalid(i.to_string())),
        Cell::Float(f) if f.is_nan() => Ok(None),
        Cell::Float(f) => {
            if f.fract() == 0.0 && *f >= i32::MIN as f64 && *f <= i32::MAX as f64 {
                Ok(Some(*f as i32))
            } else {
                Err(invalid(f.to_string()))
            }
        }
        Cell::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                Ok(None)
            } else {
                s.parse::<i32>().map(Some).map_err(|_| invalid(s.to_string()))
            }
        }
        Cell::Bool(b) => Err(invalid(b.to_string())),
    }
}

/// A named column of areas in km², one value per classification row.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// The classification table with the computed area columns appended.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaTable {
    classification: ClassificationTable,
    areas: Vec<AreaColumn>,
}

impl AreaTable {
    pub(crate) fn new(classification: ClassificationTable) -> Self {
        Self {
            classification,
            areas: Vec::new(),
        }
    }

    /// Appends a column, replacing an earlier one of the same name in place.
    pub(crate) fn push_column(&mut self, name: String, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.classification.len());
        match self.areas.iter_mut().find(|c| c.name == name) {
            Some(column) => column.values = values,
            None => self.areas.push(AreaColumn { name, values }),
        }
    }

    pub fn classification(&self) -> &ClassificationTable {
        &self.classification
    }

    pub fn area_columns(&self) -> &[AreaColumn] {
        &self.areas
    }

    /// Every column name: classification columns first, then area columns in emission order.
    pub fn column_names(&self) -> Vec<&str> {
        self.classification
            .columns()
            .iter()
            .map(String::as_str)
            .chain(self.areas.iter().map(|c| c.name.as_str()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.areas
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    /// Area of the first row carrying `code` in the named column.
    pub fn area(&self, code: i32, column: &str) -> Option<f64> {
        let row = self.classification.codes().iter().position(|&c| c == code)?;
        self.column(column).map(|values| values[row])
    }

    pub fn len(&self) -> usize {
        self.classification.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classification.is_empty()
    }
}
