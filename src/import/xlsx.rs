use std::io::Cursor;

use calamine::{Data, Reader, Xlsx};
use tracing::debug;

use super::sheet::{find_header, read_rows, Grid, HeaderSearch};
use super::{ImportError, ImportedRow, ProductImporter, HEADER_SCAN_ROWS};

/// Reads the first worksheet of an `.xlsx` workbook.
#[derive(Debug, Clone, Copy, Default)]
pub struct XlsxImporter;

impl ProductImporter for XlsxImporter {
    fn parse(&self, input: &[u8]) -> Result<Vec<ImportedRow>, ImportError> {
        if input.is_empty() {
            return Err(ImportError::Empty);
        }

        let mut workbook = Xlsx::new(Cursor::new(input))
            .map_err(|e| ImportError::Unreadable(e.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(ImportError::NoWorksheet)?
            .map_err(|e| ImportError::Unreadable(e.to_string()))?;

        let grid: Grid = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        if grid.iter().flatten().all(|cell| cell.trim().is_empty()) {
            return Err(ImportError::Empty);
        }

        match find_header(&grid) {
            HeaderSearch::Found { row, columns } => {
                debug!(header_row = row + 1, "Located header row");
                Ok(read_rows(&grid, row, columns))
            }
            HeaderSearch::Partial(missing) => Err(ImportError::MissingColumns(
                missing.iter().map(ToString::to_string).collect(),
            )),
            HeaderSearch::Absent => Err(ImportError::HeaderNotFound(HEADER_SCAN_ROWS)),
        }
    }
}

/// Text of a cell as the price and quantity parsers expect it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(text) => text.clone(),
        Data::Int(value) => value.to_string(),
        Data::Float(value) => value.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use rust_xlsxwriter::Workbook;

    fn workbook(build: impl FnOnce(&mut rust_xlsxwriter::Worksheet)) -> Vec<u8> {
        let mut workbook = Workbook::new();
        build(workbook.add_worksheet());
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn reads_first_worksheet_with_numeric_cells() {
        let bytes = workbook(|sheet| {
            sheet.write_string(0, 0, "Прайс-лист").unwrap();
            for (col, title) in ["Наименование", "Ед. изм.", "Цена", "Количество"].iter().enumerate() {
                sheet.write_string(2, col as u16, *title).unwrap();
            }
            sheet.write_string(3, 0, "Bracket").unwrap();
            sheet.write_string(3, 1, "шт").unwrap();
            sheet.write_number(3, 2, 150.0).unwrap();
            sheet.write_number(3, 3, 1.0).unwrap();
            sheet.write_string(4, 0, "Screw").unwrap();
            sheet.write_string(4, 1, "шт").unwrap();
            sheet.write_number(4, 2, 0.35).unwrap();
            sheet.write_number(4, 3, 100.0).unwrap();
            sheet.write_string(5, 1, "шт").unwrap();
        });

        let rows = XlsxImporter.parse(&bytes).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Bracket");
        assert_eq!(rows[0].unit_price, dec!(150));
        assert_eq!(rows[0].quantity, 1);
        assert_eq!(rows[1].unit_price, dec!(0.35));
        assert_eq!(rows[1].quantity, 100);
    }

    #[test]
    fn text_price_cells_use_sheet_formats() {
        let bytes = workbook(|sheet| {
            for (col, title) in ["name", "unit", "price", "qty"].iter().enumerate() {
                sheet.write_string(0, col as u16, *title).unwrap();
            }
            sheet.write_string(1, 0, "Hinge").unwrap();
            sheet.write_string(1, 1, "pcs").unwrap();
            sheet.write_string(1, 2, "60,00 €").unwrap();
            sheet.write_string(1, 3, "2").unwrap();
        });

        let rows = XlsxImporter.parse(&bytes).unwrap();
        assert_eq!(rows[0].unit_price, dec!(60));
        assert_eq!(rows[0].quantity, 2);
    }

    #[test]
    fn partial_header_reports_missing_columns() {
        let bytes = workbook(|sheet| {
            sheet.write_string(0, 0, "name").unwrap();
            sheet.write_string(0, 1, "price").unwrap();
        });
        assert_matches!(
            XlsxImporter.parse(&bytes),
            Err(ImportError::MissingColumns(missing)) if missing == vec!["unit".to_string(), "quantity".to_string()]
        );
    }

    #[test]
    fn blank_workbook_is_empty() {
        let bytes = workbook(|_| {});
        assert_matches!(XlsxImporter.parse(&bytes), Err(ImportError::Empty));
    }

    #[test]
    fn corrupt_archive_is_unreadable() {
        assert_matches!(
            XlsxImporter.parse(b"PK\x03\x04 not really a zip"),
            Err(ImportError::Unreadable(_))
        );
    }
}
