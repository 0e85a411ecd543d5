//! On-demand export of the history export log
//!
//! [`ExportCoordinator`] copies the export log out of the shared history
//! under a single read lock, so a sample arriving mid-export can never leave
//! the four columns misaligned. The copy is then written as `.xlsx` or `.csv`
//! depending on the destination extension.
//!
//! Files are written next to the destination first and renamed into place,
//! so a failed export never leaves a truncated document behind.

use crate::error::{ClimaVisError, Result, ResultExt};
use crate::history::{read_history, ExportRow, HistoryBuffer, SharedHistory};
use crate::types::Channel;
use chrono::NaiveDateTime;
use rust_xlsxwriter::{Format, Workbook};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Worksheet title of exported workbooks
pub const SHEET_TITLE: &str = "Datos de Sensores";

/// Column headers in export order
pub const EXPORT_HEADER: [&str; Channel::COUNT] = [
    "Temperature (°C)",
    "Humidity (%)",
    "Pressure (mbar)",
    "AQI",
];

/// File name offered by the destination picker, e.g. `sensor_data_20250101_120000.xlsx`
pub fn default_export_name(at: NaiveDateTime) -> String {
    format!("sensor_data_{}.xlsx", at.format("%Y%m%d_%H%M%S"))
}

/// Output file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn display_name(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "Excel Workbook",
            ExportFormat::Csv => "CSV",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    /// Pick the format from a destination path
    ///
    /// Unknown or missing extensions get `.xlsx` appended.
    pub fn resolve(path: &Path) -> (PathBuf, ExportFormat) {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        match ext.as_deref() {
            Some("xlsx") => (path.to_path_buf(), ExportFormat::Xlsx),
            Some("csv") => (path.to_path_buf(), ExportFormat::Csv),
            _ => {
                let mut name = path.as_os_str().to_os_string();
                name.push(".xlsx");
                (PathBuf::from(name), ExportFormat::Xlsx)
            }
        }
    }
}

/// Header row plus one row per retained sample
#[derive(Debug, Clone, PartialEq)]
pub struct TabularDocument {
    pub header: [&'static str; Channel::COUNT],
    pub rows: Vec<ExportRow>,
}

impl TabularDocument {
    pub fn from_rows(rows: Vec<ExportRow>) -> Self {
        Self {
            header: EXPORT_HEADER,
            rows,
        }
    }

    pub fn from_history(history: &HistoryBuffer) -> Self {
        Self::from_rows(history.export_rows())
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Write the document to `path` in the given format
    pub fn write(&self, path: &Path, format: ExportFormat) -> Result<()> {
        let staging = staging_path(path);

        let written = match format {
            ExportFormat::Xlsx => self.write_xlsx(&staging),
            ExportFormat::Csv => self.write_csv(&staging),
        };

        if let Err(e) = written {
            let _ = std::fs::remove_file(&staging);
            return Err(e);
        }

        std::fs::rename(&staging, path)
            .with_context(|| format!("Failed to move export into place at {}", path.display()))
    }

    fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", self.header.join(","))?;
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| cell.map(|v| v.to_string()).unwrap_or_default())
                .collect();
            writeln!(writer, "{}", cells.join(","))?;
        }

        writer.flush()?;
        Ok(())
    }

    fn write_xlsx(&self, path: &Path) -> Result<()> {
        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();

        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_TITLE)?;

        for (col, title) in self.header.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *title, &bold)?;
            sheet.set_column_width(col as u16, 18)?;
        }

        for (i, row) in self.rows.iter().enumerate() {
            let excel_row = (i + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                if let Some(value) = cell {
                    sheet.write_number(excel_row, col as u16, *value)?;
                }
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    path.with_file_name(format!(".{}.partial", name))
}

/// Result of one export request
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    Success { path: PathBuf, rows: usize },
    /// The user closed the destination picker
    Cancelled,
    IoFailure(String),
}

impl ExportOutcome {
    /// One-line text for the status bar
    pub fn status_message(&self) -> String {
        match self {
            ExportOutcome::Success { path, rows } => {
                format!("Exported {} rows to {}", rows, path.display())
            }
            ExportOutcome::Cancelled => "Export cancelled".to_string(),
            ExportOutcome::IoFailure(reason) => format!("Error: {}", reason),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Success { .. })
    }
}

/// Something that picks an export destination, or cancels
pub trait DestinationChooser {
    fn choose(&mut self) -> Option<PathBuf>;
}

impl<T: FnMut() -> Option<PathBuf>> DestinationChooser for T {
    fn choose(&mut self) -> Option<PathBuf> {
        self()
    }
}

/// Exports the shared history on demand
#[derive(Debug, Clone)]
pub struct ExportCoordinator {
    history: SharedHistory,
}

impl ExportCoordinator {
    pub fn new(history: SharedHistory) -> Self {
        Self { history }
    }

    /// Consistent copy of the export log
    pub fn snapshot(&self) -> TabularDocument {
        TabularDocument::from_history(&read_history(&self.history))
    }

    /// Export to `destination`; `None` means the user cancelled
    pub fn export(&self, destination: Option<PathBuf>) -> ExportOutcome {
        let Some(destination) = destination else {
            tracing::debug!("Export cancelled by user");
            return ExportOutcome::Cancelled;
        };

        let (path, format) = ExportFormat::resolve(&destination);
        let document = self.snapshot();

        match document.write(&path, format) {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    rows = document.row_count(),
                    format = format.display_name(),
                    "History exported"
                );
                ExportOutcome::Success {
                    path,
                    rows: document.row_count(),
                }
            }
            Err(e) => {
                tracing::error!(path = %path.display(), "Export failed: {}", e);
                ExportOutcome::IoFailure(flatten_error(&e))
            }
        }
    }

    /// Ask `chooser` for a destination, then export
    pub fn export_with<C: DestinationChooser + ?Sized>(&self, chooser: &mut C) -> ExportOutcome {
        let destination = chooser.choose();
        self.export(destination)
    }
}

fn flatten_error(err: &ClimaVisError) -> String {
    match err {
        ClimaVisError::WithContext { context, source } => {
            format!("{}: {}", context, flatten_error(source))
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorSample;
    use tempfile::tempdir;

    #[test]
    fn test_default_export_name_carries_timestamp() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|d| d.and_hms_opt(7, 5, 30))
            .unwrap();
        assert_eq!(default_export_name(at), "sensor_data_20240309_070530.xlsx");
    }

    fn coordinator_with_two_samples() -> ExportCoordinator {
        let history = HistoryBuffer::default().into_shared();
        {
            let mut h = crate::history::write_history(&history);
            h.append(&SensorSample::new(20.0, 50.0, 1010.0, 10, false));
            h.append(&SensorSample::new(21.0, 51.0, 1011.0, 12, true));
        }
        ExportCoordinator::new(history)
    }

    #[test]
    fn test_resolve_format() {
        assert_eq!(
            ExportFormat::resolve(Path::new("/tmp/a.csv")),
            (PathBuf::from("/tmp/a.csv"), ExportFormat::Csv)
        );
        assert_eq!(
            ExportFormat::resolve(Path::new("/tmp/a.XLSX")),
            (PathBuf::from("/tmp/a.XLSX"), ExportFormat::Xlsx)
        );
        assert_eq!(
            ExportFormat::resolve(Path::new("/tmp/readings")),
            (PathBuf::from("/tmp/readings.xlsx"), ExportFormat::Xlsx)
        );
        assert_eq!(
            ExportFormat::resolve(Path::new("/tmp/readings.txt")),
            (PathBuf::from("/tmp/readings.txt.xlsx"), ExportFormat::Xlsx)
        );
    }

    #[test]
    fn test_csv_export_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("readings.csv");

        let outcome = coordinator_with_two_samples().export(Some(path.clone()));
        assert_eq!(
            outcome,
            ExportOutcome::Success {
                path: path.clone(),
                rows: 2
            }
        );

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Temperature (°C),Humidity (%),Pressure (mbar),AQI",
                "20,50,1010,10",
                "21,51,1011,12",
            ]
        );
        // No staging file left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_xlsx_export_writes_file() {
        let dir = tempdir().unwrap();
        let outcome = coordinator_with_two_samples().export(Some(dir.path().join("readings")));

        let expected = dir.path().join("readings.xlsx");
        assert!(outcome.is_success());
        assert!(expected.exists());
        // xlsx is a zip container
        let bytes = std::fs::read(&expected).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_cancel_is_not_an_error() {
        let mut chooser = || -> Option<PathBuf> { None };
        let outcome = coordinator_with_two_samples().export_with(&mut chooser);
        assert_eq!(outcome, ExportOutcome::Cancelled);
        assert_eq!(outcome.status_message(), "Export cancelled");
    }

    #[test]
    fn test_unwritable_destination_reports_failure() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("out.csv");

        let outcome = coordinator_with_two_samples().export(Some(path));
        match &outcome {
            ExportOutcome::IoFailure(reason) => assert!(reason.contains("Failed to create")),
            other => panic!("expected IoFailure, got {:?}", other),
        }
        assert!(outcome.status_message().starts_with("Error: "));
    }

    #[test]
    fn test_snapshot_of_empty_history() {
        let coordinator = ExportCoordinator::new(HistoryBuffer::default().into_shared());
        let doc = coordinator.snapshot();
        assert_eq!(doc.header, EXPORT_HEADER);
        assert_eq!(doc.row_count(), 0);
    }
}
