// src/sink/local.rs

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use tracing::{info, instrument};

use crate::{error::Result, process::Table};

/// `<provider>/<YYYY>/<MM>/<DD>`, the layout shared by local output and
/// remote folders.
pub fn dated_folder(provider: &str, date: NaiveDate) -> String {
    format!("{}/{}", provider, date.format("%Y/%m/%d"))
}

/// Local path for a dated output file, with an optional extra directory
/// between the day and the file name.
pub fn dated_path(
    root: &Path,
    provider: &str,
    date: NaiveDate,
    subdir: Option<&str>,
    file_name: &str,
) -> PathBuf {
    let mut path = root.join(dated_folder(provider, date));
    if let Some(sub) = subdir {
        path.push(sub);
    }
    path.push(file_name);
    path
}

/// Write header + rows to `path`, replacing anything already there.
///
/// Parent directories are created. The file is written beside the target
/// and renamed over it, so readers never see a half-written file.
#[instrument(level = "info", skip(path, table), fields(path = %path.display()))]
pub fn write_csv(path: &Path, table: &Table) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "output.csv".to_string());
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));

    {
        let mut writer = csv::Writer::from_path(&tmp_path)?;
        writer.write_record(&table.header)?;
        for row in &table.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
    }
    fs::rename(&tmp_path, path)?;

    info!(rows = table.len(), "CSV file saved");
    Ok(table.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> Table {
        let mut t = Table::new(&["Date", "Service", "Cost (USD)"]);
        t.push(vec!["2025-01-01".into(), "S3".into(), "1.23".into()]);
        t.push(vec![
            "2025-01-01".into(),
            "Amazon Elastic Compute Cloud - Compute, \"GPU\"".into(),
            "0.00000000123456789".into(),
        ]);
        t
    }

    #[test]
    fn round_trip_keeps_decimal_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let table = sample();
        write_csv(&path, &table).unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let header: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, table.header);
        let rows: Vec<Vec<String>> = rdr
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows, table.rows);
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale,data\n1,2\n3,4\n5,6\n").unwrap();

        let mut t = Table::new(&["A"]);
        t.push(vec!["x".into()]);
        write_csv(&path, &t).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "A\nx\n");
        assert!(!dir.path().join(".out.csv.tmp").exists());
    }

    #[test]
    fn creates_dated_directories() {
        let dir = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 5).unwrap();
        let path = dated_path(dir.path(), "AWS", date, Some("per_account"), "costs.csv");
        assert!(path.ends_with("AWS/2025/01/05/per_account/costs.csv"));

        write_csv(&path, &sample()).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn folder_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        assert_eq!(dated_folder("Azure", date), "Azure/2025/01/15");
    }
}
