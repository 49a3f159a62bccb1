// Spreadsheet Readers - xlsx/xls/ods via calamine, csv via the csv crate
// Every reader yields the same shape: a header row plus typed cells per data row.

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use std::fs::File;
use std::path::Path;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Container format of an input file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    /// Excel / OpenDocument workbook (first worksheet is read)
    Workbook,
    /// Comma separated values with a header line
    Csv,
}

impl SheetFormat {
    pub fn name(&self) -> &str {
        match self {
            SheetFormat::Workbook => "workbook",
            SheetFormat::Csv => "csv",
        }
    }
}

/// A single cell value, independent of the container format.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }
}

/// One data row. `line` is the 1-based row number in the source file
/// (the header is line 1).
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl SheetRow {
    pub fn get(&self, index: usize) -> &Cell {
        self.cells.get(index).unwrap_or(&Cell::Empty)
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().all(Cell::is_empty)
    }
}

/// Whole sheet: header titles plus data rows in file order.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub headers: Vec<String>,
    pub rows: Vec<SheetRow>,
}

impl Sheet {
    /// Column index of a header title (trimmed, case-insensitive).
    pub fn column(&self, title: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(title.trim()))
    }
}

// ============================================================================
// READER TRAIT
// ============================================================================

pub trait SheetReader {
    /// Read the header row and every data row of the file.
    fn read(&self, path: &Path) -> Result<Sheet>;

    fn format(&self) -> SheetFormat;
}

/// Detect the container format from the file extension.
pub fn detect_format(path: &Path) -> Result<SheetFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SheetFormat::Workbook),
        "csv" => Ok(SheetFormat::Csv),
        _ => Err(anyhow!(
            "Unsupported spreadsheet extension {:?}: {}",
            ext,
            path.display()
        )),
    }
}

pub fn get_reader(format: SheetFormat) -> Box<dyn SheetReader> {
    match format {
        SheetFormat::Workbook => Box::new(WorkbookReader),
        SheetFormat::Csv => Box::new(CsvReader),
    }
}

// ============================================================================
// WORKBOOK READER (calamine)
// ============================================================================

pub struct WorkbookReader;

impl SheetReader for WorkbookReader {
    fn read(&self, path: &Path) -> Result<Sheet> {
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| anyhow!("Workbook has no worksheets: {}", path.display()))?
            .with_context(|| format!("Failed to read first worksheet of {}", path.display()))?;

        // Range coordinates start at the first used cell, not at A1.
        let first_line = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header) => header.iter().map(cell_text).collect(),
            None => return Ok(Sheet::default()),
        };

        let rows = rows
            .enumerate()
            .map(|(i, row)| SheetRow {
                line: first_line + i + 1,
                cells: row.iter().map(convert_cell).collect(),
            })
            .collect();

        Ok(Sheet { headers, rows })
    }

    fn format(&self) -> SheetFormat {
        SheetFormat::Workbook
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn convert_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Cell::Date(datetime.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            let day = s.get(..10).unwrap_or(s.as_str());
            match NaiveDate::parse_from_str(day, "%Y-%m-%d") {
                Ok(date) => Cell::Date(date),
                Err(_) => Cell::Text(s.clone()),
            }
        }
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
    }
}

// ============================================================================
// CSV READER
// ============================================================================

pub struct CsvReader;

impl SheetReader for CsvReader {
    fn read(&self, path: &Path) -> Result<Sheet> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?;

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .with_context(|| format!("Failed to read CSV header in {}", path.display()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", i + 2, path.display())
            })?;
            let line = record.position().map(|p| p.line() as usize).unwrap_or(i + 2);

            rows.push(SheetRow {
                line,
                cells: record.iter().map(Cell::from_text).collect(),
            });
        }

        Ok(Sheet { headers, rows })
    }

    fn format(&self) -> SheetFormat {
        SheetFormat::Csv
    }
}

/// Read any supported spreadsheet file.
pub fn read_sheet(path: &Path) -> Result<Sheet> {
    let format = detect_format(path)?;
    get_reader(format).read(path)
}
