//! CSV trade and candle logs.
//!
//! Both logs flush after every row so a crash loses at most the row in
//! flight. The candle log is the replay input used to verify a live session.

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Writer, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use pullback_core::error::DataError;
use pullback_core::traits::{BarSink, TradeSink};
use pullback_core::types::{Direction, TimedBar, TradeRecord};

use crate::csv_source::parse_timestamp;

/// Candle log row.
#[derive(Debug, Serialize)]
struct CandleRow {
    timestamp: DateTime<Utc>,
    open: f64,
    close: f64,
}

const TRADE_COLUMNS: [&str; 10] = [
    "symbol",
    "direction",
    "entry_time",
    "entry_price",
    "entry_candle",
    "entry_htf",
    "exit_time",
    "exit_price",
    "exit_candle",
    "exit_htf",
];

const CANDLE_COLUMNS: [&str; 3] = ["timestamp", "open", "close"];

fn write_error(e: impl std::fmt::Display) -> DataError {
    DataError::WriteError(e.to_string())
}

/// Truncate `path` and write the header, so an empty log is still readable.
fn create_with_header(path: &Path, columns: &[&str]) -> Result<Writer<File>, DataError> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(write_error)?;
    writer.write_record(columns).map_err(write_error)?;
    writer.flush().map_err(write_error)?;
    Ok(writer)
}

/// Writes completed trades to a CSV file.
pub struct CsvTradeLog {
    writer: Writer<File>,
}

impl CsvTradeLog {
    /// Create (truncate) the trade log and write its header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let writer = create_with_header(path.as_ref(), &TRADE_COLUMNS)?;
        Ok(Self { writer })
    }

    /// Write all trades at once.
    pub fn write_all(
        path: impl AsRef<Path>,
        trades: &[TradeRecord],
    ) -> Result<(), DataError> {
        let mut log = Self::create(path)?;
        for trade in trades {
            log.record(trade)?;
        }
        Ok(())
    }
}

impl TradeSink for CsvTradeLog {
    fn record(&mut self, trade: &TradeRecord) -> Result<(), DataError> {
        self.writer.serialize(trade).map_err(write_error)?;
        self.writer.flush().map_err(write_error)
    }

    fn flush(&mut self) -> Result<(), DataError> {
        self.writer.flush().map_err(write_error)
    }
}

/// Writes accepted bars to a CSV file for later replay.
pub struct CsvBarLog {
    writer: Writer<File>,
}

impl CsvBarLog {
    /// Create (truncate) the candle log and write its header.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let writer = create_with_header(path.as_ref(), &CANDLE_COLUMNS)?;
        Ok(Self { writer })
    }
}

impl BarSink for CsvBarLog {
    fn record(&mut self, bar: &TimedBar) -> Result<(), DataError> {
        let row = CandleRow {
            timestamp: bar.datetime(),
            open: bar.bar.open,
            close: bar.bar.close,
        };
        self.writer.serialize(row).map_err(write_error)?;
        self.writer.flush().map_err(write_error)
    }

    fn flush(&mut self) -> Result<(), DataError> {
        self.writer.flush().map_err(write_error)
    }
}

/// Trade log row as read back. Times are parsed leniently so logs written
/// by other tools can be compared too.
#[derive(Debug, Deserialize)]
struct TradeRow {
    symbol: String,
    direction: Direction,
    entry_time: String,
    entry_price: f64,
    entry_candle: usize,
    entry_htf: usize,
    exit_time: String,
    exit_price: f64,
    exit_candle: usize,
    exit_htf: usize,
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, DataError> {
    let millis = parse_timestamp(s)?;
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| DataError::ParseError(format!("timestamp out of range: {}", s)))
}

/// Read a trade log.
pub fn load_trades(path: impl AsRef<Path>) -> Result<Vec<TradeRecord>, DataError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(DataError::NoDataAvailable);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataError::ParseError(e.to_string()))?;

    let mut trades = Vec::new();
    for result in reader.deserialize() {
        let row: TradeRow = result.map_err(|e| DataError::ParseError(e.to_string()))?;
        trades.push(TradeRecord {
            symbol: row.symbol,
            direction: row.direction,
            entry_time: parse_time(&row.entry_time)?,
            entry_price: row.entry_price,
            entry_index: row.entry_candle,
            entry_htf_index: row.entry_htf,
            exit_time: parse_time(&row.exit_time)?,
            exit_price: row.exit_price,
            exit_index: row.exit_candle,
            exit_htf_index: row.exit_htf,
        });
    }

    Ok(trades)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv_source::CsvBarSource;
    use std::io::Write;

    fn trade(entry_minute: i64, exit_minute: i64) -> TradeRecord {
        let base = 1_705_312_800;
        TradeRecord {
            symbol: "BTCUSDT".to_string(),
            direction: Direction::Long,
            entry_time: DateTime::from_timestamp(base + entry_minute * 60, 0).unwrap(),
            entry_price: 42_000.5,
            entry_index: 7,
            entry_htf_index: 1,
            exit_time: DateTime::from_timestamp(base + exit_minute * 60, 0).unwrap(),
            exit_price: 42_010.25,
            exit_index: 9,
            exit_htf_index: 1,
        }
    }

    #[test]
    fn test_trade_log_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");

        let trades = vec![trade(6, 8), trade(12, 20)];
        CsvTradeLog::write_all(&path, &trades).unwrap();

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with(
            "symbol,direction,entry_time,entry_price,entry_candle,entry_htf,exit_time,exit_price,exit_candle,exit_htf"
        ));
        assert_eq!(load_trades(&path).unwrap(), trades);
    }

    #[test]
    fn test_empty_logs_have_headers() {
        let dir = tempfile::tempdir().unwrap();
        let trades_path = dir.path().join("trades.csv");
        let candles_path = dir.path().join("candles.csv");

        drop(CsvTradeLog::create(&trades_path).unwrap());
        drop(CsvBarLog::create(&candles_path).unwrap());

        let trades_text = std::fs::read_to_string(&trades_path).unwrap();
        assert_eq!(trades_text.lines().collect::<Vec<_>>(), vec![TRADE_COLUMNS.join(",")]);
        let candles_text = std::fs::read_to_string(&candles_path).unwrap();
        assert_eq!(candles_text.lines().collect::<Vec<_>>(), vec!["timestamp,open,close"]);
        assert!(load_trades(&trades_path).unwrap().is_empty());
        assert!(CsvBarSource::new(&candles_path).unwrap().load().unwrap().is_empty());
    }

    #[test]
    fn test_load_trades_accepts_naive_times() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "symbol,direction,entry_time,entry_price,entry_candle,entry_htf,exit_time,exit_price,exit_candle,exit_htf").unwrap();
        writeln!(file, "BTCUSDT,LONG,2024-01-15 10:06:00,42000.5,7,1,2024-01-15 10:08:00,42010.25,9,1").unwrap();
        file.flush().unwrap();

        let trades = load_trades(file.path()).unwrap();
        assert_eq!(trades, vec![trade(6, 8)]);
    }

    #[test]
    fn test_candle_log_replays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("candles.csv");

        let bars = vec![
            TimedBar::new(1_705_313_100_000, 100.0, 101.5),
            TimedBar::new(1_705_313_160_000, 101.5, 100.25),
        ];
        let mut log = CsvBarLog::create(&path).unwrap();
        for bar in &bars {
            log.record(bar).unwrap();
        }
        drop(log);

        let loaded = CsvBarSource::new(&path).unwrap().load().unwrap();
        assert_eq!(loaded, bars);
    }
}
