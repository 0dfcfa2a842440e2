use tracing::debug;

use super::sheet::{find_header, read_rows, ColumnMap, Grid, HeaderSearch};
use super::{ImportError, ImportedRow, ProductImporter, HEADER_SCAN_ROWS};

const DELIMITERS: [u8; 3] = [b'\t', b';', b','];

/// Reads a price list exported from a spreadsheet as delimited text
/// (tab, semicolon or comma separated, detected per document).
///
/// Title lines above the header row are ignored. Quoted cells may contain the
/// delimiter, doubled quotes and line breaks.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedTextImporter;

impl ProductImporter for DelimitedTextImporter {
    fn parse(&self, input: &[u8]) -> Result<Vec<ImportedRow>, ImportError> {
        let text = std::str::from_utf8(input).map_err(|_| ImportError::InvalidEncoding)?;
        let text = text.trim_start_matches('\u{feff}');
        if text.trim().is_empty() {
            return Err(ImportError::Empty);
        }

        let mut best_partial = HeaderSearch::Absent;
        let mut located: Option<(u8, Grid, usize, ColumnMap)> = None;

        for delimiter in DELIMITERS {
            let grid = read_grid(text, delimiter)?;
            match find_header(&grid) {
                HeaderSearch::Found { row, columns } => {
                    // the delimiter whose header sits highest wins
                    if located.as_ref().map_or(true, |(_, _, best, _)| row < *best) {
                        located = Some((delimiter, grid, row, columns));
                    }
                }
                partial => {
                    if partial.found_columns() > best_partial.found_columns() {
                        best_partial = partial;
                    }
                }
            }
        }

        let Some((delimiter, grid, row, columns)) = located else {
            return Err(match best_partial {
                HeaderSearch::Partial(missing) => ImportError::MissingColumns(
                    missing.iter().map(ToString::to_string).collect(),
                ),
                _ => ImportError::HeaderNotFound(HEADER_SCAN_ROWS),
            });
        };
        debug!(
            header_row = row + 1,
            delimiter = ?char::from(delimiter),
            "Located header row"
        );

        Ok(read_rows(&grid, row, columns))
    }
}

/// Splits the document into records of raw cell text.
fn read_grid(text: &str, delimiter: u8) -> Result<Grid, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    reader
        .records()
        .map(|record| {
            record
                .map(|r| r.iter().map(str::to_string).collect())
                .map_err(|e| ImportError::Unreadable(e.to_string()))
        })
        .collect()
}
