//! Ticker universe loaded from a CSV file with a `Ticker` column.

use crate::models::normalize_ticker_symbol;
use anyhow::{anyhow, Context, Result};
use log::info;
use std::collections::HashSet;
use std::path::Path;

/// Reads the universe file, returning normalized symbols in file order
/// with duplicates removed. An empty universe is a configuration error.
pub fn load_universe(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open universe file {}", path.display()))?;

    let headers = reader
        .headers()
        .context("failed to read universe file headers")?;
    let ticker_column = headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case("ticker"))
        .ok_or_else(|| {
            anyhow!(
                "Universe file {} has no Ticker column (headers: {:?})",
                path.display(),
                headers
            )
        })?;

    let mut seen = HashSet::new();
    let mut tickers = Vec::new();
    for record in reader.records() {
        let record = record.context("failed to read universe file row")?;
        let Some(raw) = record.get(ticker_column) else {
            continue;
        };
        let Some(symbol) = normalize_ticker_symbol(raw) else {
            continue;
        };
        if seen.insert(symbol.clone()) {
            tickers.push(symbol);
        }
    }

    if tickers.is_empty() {
        return Err(anyhow!(
            "Universe file {} contains no tickers",
            path.display()
        ));
    }

    info!("Loaded {} ticker(s) from {}", tickers.len(), path.display());
    Ok(tickers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "universe-test-{}-{}.csv",
            std::process::id(),
            contents.len()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_ordered_deduplicated_symbols() {
        let path = write_temp("Ticker,Company\nnvda,NVIDIA\nAAPL,Apple\n nvda ,Dup\n,Blank\n");
        let tickers = load_universe(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(tickers, vec!["NVDA".to_string(), "AAPL".to_string()]);
    }

    #[test]
    fn missing_ticker_column_is_fatal() {
        let path = write_temp("Symbol,Company\nNVDA,NVIDIA\n");
        let result = load_universe(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }

    #[test]
    fn empty_universe_is_fatal() {
        let path = write_temp("Ticker\n\n");
        let result = load_universe(&path);
        std::fs::remove_file(&path).ok();
        assert!(result.is_err());
    }
}
