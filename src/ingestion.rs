use crate::error::{FecError, Result};
use crate::schema::LedgerEntry;
use csv::{ReaderBuilder, StringRecord};
use log::debug;
use std::io::Read;

/// The columns a FEC export must carry for the engine to work at all.
/// Everything else is optional and defaults to empty.
const REQUIRED_COLUMNS: [&str; 4] = ["EcritureNum", "CompteNum", "Debit", "Credit"];

/// Parses FEC content into ledger entries. This is the upload boundary:
/// the only place in the crate that fails hard. Statutory exports are
/// tab- or pipe-delimited; the delimiter is sniffed from the header line,
/// and a UTF-8 BOM is tolerated.
pub fn parse_fec_str(content: &str) -> Result<Vec<LedgerEntry>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let header_line = content.lines().next().unwrap_or("");
    let delimiter = detect_delimiter(header_line);
    parse_fec_reader(content.as_bytes(), delimiter)
}

/// Picks the candidate separator occurring most often in the header line.
/// Tab wins ties, matching the statutory default.
pub fn detect_delimiter(header_line: &str) -> u8 {
    // max_by_key keeps the last of equal maxima, so tab sits last.
    [b',', b';', b'|', b'\t']
        .into_iter()
        .max_by_key(|&candidate| header_line.bytes().filter(|&b| b == candidate).count())
        .unwrap_or(b'\t')
}

/// Parses FEC content from any reader with an explicit delimiter.
/// Header lookup is case- and whitespace-insensitive; a missing required
/// column rejects the whole file before any entry reaches the core.
pub fn parse_fec_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<LedgerEntry>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    let columns = ColumnIndex::from_headers(&headers)?;

    let mut entries = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        entries.push(columns.entry(&record));
    }

    debug!("parsed {} ledger entries from FEC file", entries.len());
    Ok(entries)
}

struct ColumnIndex {
    ecriture_num: usize,
    compte_num: usize,
    compte_lib: Option<usize>,
    ecriture_date: Option<usize>,
    debit: usize,
    credit: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        if headers.iter().all(|header| header.trim().is_empty()) {
            return Err(FecError::EmptyFile);
        }

        let find = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim().eq_ignore_ascii_case(name))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| FecError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            ecriture_num: require("EcritureNum")?,
            compte_num: require("CompteNum")?,
            debit: require("Debit")?,
            credit: require("Credit")?,
            compte_lib: find("CompteLib"),
            ecriture_date: find("EcritureDate"),
        })
    }

    fn entry(&self, record: &StringRecord) -> LedgerEntry {
        let field = |index: usize| record.get(index).unwrap_or("").to_string();
        let optional = |index: Option<usize>| index.map(|i| field(i)).unwrap_or_default();

        LedgerEntry {
            ecriture_num: field(self.ecriture_num),
            compte_num: field(self.compte_num),
            compte_lib: optional(self.compte_lib),
            ecriture_date: optional(self.ecriture_date),
            debit: field(self.debit),
            credit: field(self.credit),
        }
    }
}
