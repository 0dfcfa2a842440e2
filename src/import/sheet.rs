use strum::IntoEnumIterator;
use tracing::debug;

use super::{normalize_header, parse_price, parse_quantity, Column, ImportedRow, HEADER_SCAN_ROWS};

/// Cell text of one sheet, row by row.
pub(crate) type Grid = Vec<Vec<String>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnMap {
    name: usize,
    unit: usize,
    price: usize,
    quantity: usize,
}

impl ColumnMap {
    fn from_header(cells: &[String]) -> Result<Self, Vec<Column>> {
        let find = |column: Column| {
            cells
                .iter()
                .position(|cell| column.matches(&normalize_header(cell)))
        };
        match (
            find(Column::Name),
            find(Column::Unit),
            find(Column::Price),
            find(Column::Quantity),
        ) {
            (Some(name), Some(unit), Some(price), Some(quantity)) => Ok(Self {
                name,
                unit,
                price,
                quantity,
            }),
            _ => Err(Column::iter().filter(|c| find(*c).is_none()).collect()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HeaderSearch {
    Found { row: usize, columns: ColumnMap },
    /// Best leading row naming at least two required columns, with the ones it lacks.
    Partial(Vec<Column>),
    Absent,
}

impl HeaderSearch {
    pub(crate) fn found_columns(&self) -> usize {
        match self {
            HeaderSearch::Found { .. } => Column::iter().count(),
            HeaderSearch::Partial(missing) => Column::iter().count() - missing.len(),
            HeaderSearch::Absent => 0,
        }
    }
}

/// Finds the first of the leading rows naming all required columns.
pub(crate) fn find_header(grid: &[Vec<String>]) -> HeaderSearch {
    let mut best = HeaderSearch::Absent;

    for (row, cells) in grid.iter().take(HEADER_SCAN_ROWS).enumerate() {
        match ColumnMap::from_header(cells) {
            Ok(columns) => return HeaderSearch::Found { row, columns },
            Err(missing) => {
                let found = Column::iter().count() - missing.len();
                if found >= 2 && found > best.found_columns() {
                    best = HeaderSearch::Partial(missing);
                }
            }
        }
    }

    best
}

/// Reads the data rows below the header.
///
/// Rows without a name are skipped, as are rows whose price or quantity
/// cannot be parsed.
pub(crate) fn read_rows(grid: &[Vec<String>], header_row: usize, columns: ColumnMap) -> Vec<ImportedRow> {
    let mut rows = Vec::new();

    for cells in grid.iter().skip(header_row + 1) {
        let cell = |index: usize| cells.get(index).map(|c| c.trim()).unwrap_or("");

        let name = cell(columns.name);
        if name.is_empty() {
            continue;
        }
        let (Some(unit_price), Some(quantity)) =
            (parse_price(cell(columns.price)), parse_quantity(cell(columns.quantity)))
        else {
            debug!(row = name, "Skipping row with unparsable price or quantity");
            continue;
        };

        rows.push(ImportedRow {
            name: name.to_string(),
            unit: cell(columns.unit).to_string(),
            unit_price,
            quantity,
        });
    }

    rows
}
