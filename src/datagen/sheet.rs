//! Workbook generator for file collection tasks
//!
//! Headers come from the first row of the template's first worksheet. Rows
//! are generated per inferred field kind and written back out as xlsx.

use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rust_xlsxwriter::Workbook;
use serde_json::{Map, Value};

use super::field::FieldKind;
use crate::common::{Error, Result};

/// Name of the worksheet in generated workbooks
pub const DATA_SHEET: &str = "数据";

/// Generates rows and workbooks for a set of headers
pub struct SheetGenerator {
    headers: Vec<String>,
    kinds: Vec<FieldKind>,
    rng: StdRng,
}

impl SheetGenerator {
    /// Build a generator from template bytes
    pub fn from_template(content: &[u8]) -> Result<Self> {
        let headers = read_headers(content)?;
        if headers.is_empty() {
            return Err(Error::EmptyTemplate);
        }
        Ok(Self::from_headers(headers))
    }

    /// Build a generator for known headers
    pub fn from_headers(headers: Vec<String>) -> Self {
        Self::with_rng(headers, StdRng::from_entropy())
    }

    pub fn with_rng(headers: Vec<String>, rng: StdRng) -> Self {
        let kinds = headers.iter().map(|h| FieldKind::infer(h)).collect();
        Self { headers, kinds, rng }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Inferred kind per header, in header order
    pub fn field_kinds(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.headers
            .iter()
            .map(String::as_str)
            .zip(self.kinds.iter().copied())
    }

    pub fn row(&mut self) -> Map<String, Value> {
        let mut row = Map::new();
        for (header, kind) in self.headers.iter().zip(&self.kinds) {
            row.insert(header.clone(), kind.generate(&mut self.rng));
        }
        row
    }

    pub fn rows(&mut self, count: usize) -> Vec<Map<String, Value>> {
        (0..count).map(|_| self.row()).collect()
    }

    /// Serialize rows to an xlsx workbook
    ///
    /// Cells are written in header order; missing keys become empty strings.
    pub fn to_xlsx(&self, rows: &[Map<String, Value>], include_header: bool) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        {
            let sheet = workbook.add_worksheet();
            sheet.set_name(DATA_SHEET)?;

            let mut row_idx: u32 = 0;
            if include_header {
                for (col, header) in self.headers.iter().enumerate() {
                    sheet.write_string(0, col as u16, header.as_str())?;
                }
                row_idx = 1;
            }

            for row in rows {
                for (col, header) in self.headers.iter().enumerate() {
                    let col = col as u16;
                    match row.get(header) {
                        Some(Value::Number(n)) => {
                            sheet.write_number(row_idx, col, n.as_f64().unwrap_or_default())?;
                        }
                        Some(Value::Bool(b)) => {
                            sheet.write_boolean(row_idx, col, *b)?;
                        }
                        Some(Value::String(s)) => {
                            sheet.write_string(row_idx, col, s.as_str())?;
                        }
                        Some(Value::Null) | None => {
                            sheet.write_string(row_idx, col, "")?;
                        }
                        Some(other) => {
                            sheet.write_string(row_idx, col, other.to_string())?;
                        }
                    }
                }
                row_idx += 1;
            }
        }
        Ok(workbook.save_to_buffer()?)
    }
}

/// Read the non-empty, trimmed cells of the first row of the first sheet
pub fn read_headers(content: &[u8]) -> Result<Vec<String>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(content.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("workbook has no worksheets".to_string()))??;

    let headers = range
        .rows()
        .next()
        .map(|cells| {
            cells
                .iter()
                .filter(|cell| !matches!(cell, Data::Empty))
                .map(|cell| cell.to_string().trim().to_string())
                .filter(|text| !text.is_empty())
                .collect()
        })
        .unwrap_or_default();
    Ok(headers)
}

/// Read every row below the header as strings; used to check generated files
pub fn read_rows(content: &[u8]) -> Result<Vec<Vec<String>>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(content.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Spreadsheet("workbook has no worksheets".to_string()))??;
    Ok(range
        .rows()
        .skip(1)
        .map(|cells| cells.iter().map(|c| c.to_string()).collect())
        .collect())
}
