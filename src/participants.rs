use std::fmt;
use std::io::Cursor;
use std::path::Path;

use calamine::{Reader, open_workbook_auto_from_rs};

use crate::error::Error;
use crate::model::Participant;
use crate::sanitize::sanitize;

/// Header names checked, in order, for the participant name column.
const NAME_HEADERS: [&str; 4] = ["nome", "Nome", "name", "Name"];

/// Read participants from a file: workbooks (`.xlsx`, `.xls`, `.ods`, ...)
/// and `.csv` as spreadsheets, anything else as one name per line.
pub fn from_file(path: &Path) -> Result<Vec<Participant>, Error> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let data = std::fs::read(path)?;
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => from_workbook(data),
        "csv" => from_csv(&data),
        _ => Ok(from_text(&String::from_utf8_lossy(&data))),
    }
}

/// One participant per non-empty line.
pub fn from_text(text: &str) -> Vec<Participant> {
    text.lines()
        .map(|line| sanitize(Some(line)))
        .filter(|name| !name.is_empty())
        .map(Participant::new)
        .collect()
}

/// Positions of the conventional name headers present in a header row.
struct NameColumns(Vec<usize>);

impl NameColumns {
    fn from_headers<T: fmt::Display>(headers: impl IntoIterator<Item = T>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(|h| sanitize(Some(h))).collect();
        Self(
            NAME_HEADERS
                .iter()
                .filter_map(|wanted| headers.iter().position(|h| h == wanted))
                .collect(),
        )
    }

    /// The first non-empty value under a name header, else the first column.
    fn pick(&self, cell: impl Fn(usize) -> String) -> String {
        self.0
            .iter()
            .map(|&i| cell(i))
            .find(|value| !value.is_empty())
            .unwrap_or_else(|| cell(0))
    }
}

fn detect_delimiter(header_line: &str) -> u8 {
    [b',', b';', b'\t']
        .into_iter()
        .max_by_key(|&d| header_line.bytes().filter(|&b| b == d).count())
        .filter(|&d| header_line.as_bytes().contains(&d))
        .unwrap_or(b',')
}

/// Rows of a CSV with a header row. The name is the first non-empty value
/// under a conventional name header, else the row's first column.
pub fn from_csv(data: &[u8]) -> Result<Vec<Participant>, Error> {
    let header_line = data.split(|&b| b == b'\n').next().unwrap_or_default();

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(detect_delimiter(&String::from_utf8_lossy(header_line)))
        .flexible(true)
        .from_reader(data);

    let columns = NameColumns::from_headers(reader.headers()?.iter());

    let mut participants = Vec::new();
    for record in reader.records() {
        let record = record?;
        let name = columns.pick(|i| sanitize(record.get(i)));
        if !name.is_empty() {
            participants.push(Participant::new(name));
        }
    }
    log::info!("Read {} participants from CSV", participants.len());
    Ok(participants)
}

/// Rows of the first sheet of a workbook, with the same header rules as
/// [`from_csv`]. Numbers and dates are taken as displayed by the cell value.
pub fn from_workbook(data: Vec<u8>) -> Result<Vec<Participant>, Error> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data))
        .map_err(|e| Error::SpreadsheetParse(format!("unreadable workbook: {e}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::SpreadsheetParse("workbook has no sheets".into()))?
        .map_err(|e| Error::SpreadsheetParse(format!("unreadable sheet: {e}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };
    let columns = NameColumns::from_headers(header);

    let mut participants = Vec::new();
    for row in rows {
        let name = columns.pick(|i| sanitize(row.get(i)));
        if !name.is_empty() {
            participants.push(Participant::new(name));
        }
    }
    log::info!("Read {} participants from workbook", participants.len());
    Ok(participants)
}
