// Bull Importer - spreadsheet rows -> bull records
// One persist attempt per data row, in file order. No batching, no wrapping transaction.

use chrono::{Days, NaiveDate};
use std::path::Path;
use thiserror::Error;

use crate::bull::BullAttributes;
use crate::db::BullStore;
use crate::error::StoreError;
use crate::sheet::{detect_format, get_reader, Cell, Sheet, SheetRow};

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

pub const REGISTRATION_CODE: &str = "Registration Code";
pub const NAME: &str = "Name";
pub const BORN_ON: &str = "Born On";
pub const OFFSPRING_COUNT: &str = "Offspring Count";

/// Header titles every import file must carry.
pub const REQUIRED_COLUMNS: [&str; 4] = [REGISTRATION_CODE, NAME, BORN_ON, OFFSPRING_COUNT];

/// Column indexes resolved from the header row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ColumnMap {
    registration_code: usize,
    name: usize,
    born_on: usize,
    offspring_count: usize,
}

impl ColumnMap {
    fn resolve(sheet: &Sheet) -> Result<Self, ImportError> {
        let find = |title: &'static str| {
            sheet
                .column(title)
                .ok_or(ImportError::MissingColumn(title))
        };

        Ok(ColumnMap {
            registration_code: find(REGISTRATION_CODE)?,
            name: find(NAME)?,
            born_on: find(BORN_ON)?,
            offspring_count: find(OFFSPRING_COUNT)?,
        })
    }
}

// ============================================================================
// ERRORS & REPORT
// ============================================================================

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read spreadsheet: {0:#}")]
    Sheet(anyhow::Error),

    #[error("missing column {0:?}")]
    MissingColumn(&'static str),

    #[error("row {line}: {source}")]
    Row { line: usize, source: RowError },
}

/// Why a single row could not become a record.
#[derive(Debug, Error)]
pub enum RowError {
    #[error("{column}: {message}")]
    Cell { column: &'static str, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What to do when a row fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ImportPolicy {
    /// Stop at the first bad row. Rows already inserted stay.
    #[default]
    Abort,
    /// Record the bad row in the report and carry on.
    SkipInvalid,
}

#[derive(Debug)]
pub struct SkippedRow {
    pub line: usize,
    pub error: RowError,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    /// Ids of created records, in file order
    pub created: Vec<i64>,
    pub skipped: Vec<SkippedRow>,
    pub blank_rows: usize,
}

impl ImportReport {
    pub fn created_count(&self) -> usize {
        self.created.len()
    }
}

// ============================================================================
// IMPORTER
// ============================================================================

pub struct Importer<'a, S: BullStore + ?Sized> {
    store: &'a S,
    policy: ImportPolicy,
}

impl<'a, S: BullStore + ?Sized> Importer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Importer {
            store,
            policy: ImportPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ImportPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Read `path` and create one record per data row.
    pub fn import(&self, path: &Path) -> Result<ImportReport, ImportError> {
        let format = detect_format(path).map_err(ImportError::Sheet)?;
        let reader = get_reader(format);
        log::info!("Importing bulls from {} ({})", path.display(), reader.format().name());

        let sheet = reader.read(path).map_err(ImportError::Sheet)?;
        let report = self.import_sheet(&sheet)?;

        log::info!(
            "Imported {} bulls from {} ({} skipped, {} blank rows)",
            report.created_count(),
            path.display(),
            report.skipped.len(),
            report.blank_rows
        );

        Ok(report)
    }

    /// Import an already-read sheet.
    pub fn import_sheet(&self, sheet: &Sheet) -> Result<ImportReport, ImportError> {
        let columns = ColumnMap::resolve(sheet)?;
        let mut report = ImportReport::default();

        for row in &sheet.rows {
            if row.is_blank() {
                report.blank_rows += 1;
                continue;
            }

            match self.import_row(&columns, row) {
                Ok(id) => report.created.push(id),
                Err(error) => match self.policy {
                    ImportPolicy::Abort => {
                        log::error!(
                            "Aborting import at row {} after {} created: {}",
                            row.line,
                            report.created_count(),
                            error
                        );
                        return Err(ImportError::Row {
                            line: row.line,
                            source: error,
                        });
                    }
                    ImportPolicy::SkipInvalid => {
                        log::warn!("Skipping row {}: {}", row.line, error);
                        report.skipped.push(SkippedRow {
                            line: row.line,
                            error,
                        });
                    }
                },
            }
        }

        Ok(report)
    }

    fn import_row(&self, columns: &ColumnMap, row: &SheetRow) -> Result<i64, RowError> {
        let attrs = row_attributes(columns, row)?;
        let bull = self.store.create(&attrs)?;
        log::debug!("Row {} -> bull {}", row.line, bull.id);

        Ok(bull.id)
    }
}

// ============================================================================
// CELL CONVERSION
// ============================================================================

fn row_attributes(columns: &ColumnMap, row: &SheetRow) -> Result<BullAttributes, RowError> {
    Ok(BullAttributes {
        registration_code: Some(text_value(row.get(columns.registration_code))),
        name: text_value(row.get(columns.name)),
        born_on: date_value(row.get(columns.born_on))
            .map(Some)
            .map_err(|message| RowError::Cell {
                column: BORN_ON,
                message,
            })?,
        offspring_count: count_value(row.get(columns.offspring_count))
            .map(Some)
            .map_err(|message| RowError::Cell {
                column: OFFSPRING_COUNT,
                message,
            })?,
    })
}

/// Text columns. Whole numbers lose the trailing `.0` a workbook gives them.
fn text_value(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Empty => None,
        Cell::Text(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Cell::Number(n) => Some(n.to_string()),
        Cell::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
    }
}

fn date_value(cell: &Cell) -> Result<Option<NaiveDate>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Date(d) => Ok(Some(*d)),
        Cell::Number(serial) => excel_serial_date(*serial)
            .map(Some)
            .ok_or_else(|| format!("{} is not a valid date serial", serial)),
        Cell::Text(s) => {
            let s = s.trim();
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .or_else(|_| NaiveDate::parse_from_str(s, "%d/%m/%Y"))
                .map(Some)
                .map_err(|_| format!("{:?} is not a date", s))
        }
    }
}

/// Excel's 1900 date system: serial 1 is 1900-01-01.
///
/// Excel counts a 1900-02-29 that never existed as serial 60. That serial is
/// rejected, and serials from 61 on count from 1899-12-30.
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let days = serial.floor() as u64;
    let epoch = match days {
        1..=59 => NaiveDate::from_ymd_opt(1899, 12, 31)?,
        60 => return None,
        _ => NaiveDate::from_ymd_opt(1899, 12, 30)?,
    };
    epoch.checked_add_days(Days::new(days))
}

fn count_value(cell: &Cell) -> Result<Option<i64>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Ok(Some(*n as i64)),
        Cell::Number(n) => Err(format!("{} is not a whole number", n)),
        Cell::Text(s) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| format!("{:?} is not a whole number", s.trim())),
        Cell::Date(d) => Err(format!("{} is not a whole number", d)),
    }
}
