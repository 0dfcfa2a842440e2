//! Turning uploaded price lists into row records.
//!
//! The importer only locates columns and parses cells. Business filtering
//! (non-positive quantities, trimming, length limits) is done by
//! [`ProductImportService`](crate::services::product_import::ProductImportService).

mod delimited;
mod sheet;
mod xlsx;

pub use delimited::DelimitedTextImporter;
pub use xlsx::XlsxImporter;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

/// Number of leading rows searched for the header row.
pub const HEADER_SCAN_ROWS: usize = 50;

/// One data row of an uploaded sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportedRow {
    pub name: String,
    pub unit: String,
    pub unit_price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ImportError {
    #[error("Uploaded file is empty")]
    Empty,

    #[error("Uploaded file is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("Uploaded file could not be read: {0}")]
    Unreadable(String),

    #[error("Workbook has no worksheets")]
    NoWorksheet,

    #[error("Header row was not found in the first {0} rows")]
    HeaderNotFound(usize),

    #[error("Not all required columns were found in header, missing: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// Parses an uploaded document into rows.
pub trait ProductImporter: Send + Sync {
    fn parse(&self, input: &[u8]) -> Result<Vec<ImportedRow>, ImportError>;
}

/// Leading bytes of a zip archive, which every `.xlsx` workbook is.
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// Accepts either an `.xlsx` workbook or a delimited text export, told apart
/// by the leading bytes of the upload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpreadsheetImporter;

impl ProductImporter for SpreadsheetImporter {
    fn parse(&self, input: &[u8]) -> Result<Vec<ImportedRow>, ImportError> {
        if input.starts_with(ZIP_MAGIC) {
            XlsxImporter.parse(input)
        } else {
            DelimitedTextImporter.parse(input)
        }
    }
}

/// Columns every sheet has to provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Column {
    Name,
    Unit,
    Price,
    Quantity,
}

impl Column {
    fn aliases(self) -> &'static [&'static str] {
        match self {
            Column::Name => &["наименование", "название", "товар", "name", "product"],
            Column::Unit => &["единица измерения", "ед. изм.", "ед", "unit"],
            Column::Price => &[
                "цена за единицу",
                "цена",
                "цена за единицу, евро",
                "цена за единицу евро",
                "price",
                "unit price",
            ],
            Column::Quantity => &[
                "количество",
                "кол-во",
                "количество, шт.",
                "количество шт",
                "qty",
                "quantity",
            ],
        }
    }

    /// Whether a normalized header cell names this column.
    pub(crate) fn matches(self, header: &str) -> bool {
        self.aliases().contains(&header)
    }
}

/// Trims, lower-cases and collapses runs of spaces in a header cell.
pub(crate) fn normalize_header(cell: &str) -> String {
    cell.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Parses a price cell. Accepts `1,5`, `1.5`, `1 234,50`, and a trailing `€`.
pub(crate) fn parse_price(cell: &str) -> Option<Decimal> {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let normalized = match (cleaned.rfind(','), cleaned.rfind('.')) {
        // both present: the last one is the decimal separator
        (Some(comma), Some(dot)) if comma > dot => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => {
            if cleaned.matches(',').count() > 1 {
                return None;
            }
            cleaned.replace(',', ".")
        }
        _ => cleaned,
    };

    normalized.parse::<Decimal>().ok()
}

/// Parses a quantity cell; inner spaces are allowed as thousands separators.
pub(crate) fn parse_quantity(cell: &str) -> Option<i32> {
    let cleaned: String = cell.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.parse::<i32>().ok()
}
