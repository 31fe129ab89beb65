//! CSV bar files.
//!
//! Expected header: `ticker,date,open,high,low,close,volume` with ISO
//! (`YYYY-MM-DD`) dates. Rows are read as-is; invariant checks happen at
//! screening time so bad rows are reported per ticker instead of failing the
//! whole file.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::domain::{Bar, Ticker};

#[derive(Debug, thiserror::Error)]
pub enum DataError {
    #[error("open bar file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("bad bar row {row}: {source}")]
    Row {
        row: usize,
        #[source]
        source: csv::Error,
    },
}

/// Read bars from CSV text.
pub fn read_bars<R: Read>(reader: R) -> Result<Vec<Bar>, DataError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize::<Bar>()
        .enumerate()
        .map(|(i, row)| row.map_err(|source| DataError::Row { row: i + 1, source }))
        .collect()
}

/// Read bars from a CSV file.
pub fn load_bars(path: &Path) -> Result<Vec<Bar>, DataError> {
    let file = std::fs::File::open(path).map_err(|source| DataError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_bars(file)
}

/// Split bars by ticker, keeping each ticker's bars in input order.
pub fn group_by_ticker(bars: Vec<Bar>) -> BTreeMap<Ticker, Vec<Bar>> {
    let mut groups: BTreeMap<Ticker, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        groups.entry(bar.ticker.clone()).or_default().push(bar);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
ticker,date,open,high,low,close,volume
005930,2024-01-02,52000,53500,51800,53000,24674774
000660,2024-01-02,150000,152000,149000,151000,3000000
005930,2024-01-03, 53000 ,54000,52500,53800,18000000
";

    #[test]
    fn reads_rows() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].ticker, "005930");
        assert_eq!(bars[0].volume, 24_674_774);
        assert_eq!(bars[2].open, 53_000.0);
        assert_eq!(bars[1].date.to_string(), "2024-01-02");
    }

    #[test]
    fn groups_by_ticker() {
        let groups = group_by_ticker(read_bars(SAMPLE.as_bytes()).unwrap());
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["005930"].len(), 2);
        assert_eq!(groups["000660"][0].close, 151_000.0);
    }

    #[test]
    fn bad_row_reports_position() {
        let text = "ticker,date,open,high,low,close,volume\nA,2024-01-02,1,2,0.5,1.5,x\n";
        let err = read_bars(text.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::Row { row: 1, .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let bars = load_bars(file.path()).unwrap();
        assert_eq!(bars.len(), 3);

        assert!(matches!(
            load_bars(Path::new("/nonexistent/bars.csv")),
            Err(DataError::Open { .. })
        ));
    }
}
