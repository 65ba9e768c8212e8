pub mod drive;
pub mod local;
pub mod sheets;

use clap::ValueEnum;

pub use drive::DriveClient;
pub use local::{dated_folder, dated_path, write_csv};
pub use sheets::SheetsClient;

/// Where a job's table ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkTarget {
    /// Local CSV under the output directory.
    Csv,
    /// First tab of `SPREADSHEET_ID`, cleared first when `clear` is set.
    Sheet { clear: bool },
    /// Local CSV, then uploaded under the dated Drive folder chain.
    Drive,
}

/// Command-line form of [`SinkTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum SinkKind {
    #[default]
    Csv,
    Sheet,
    Drive,
}

impl SinkKind {
    pub fn target(self, clear: bool) -> SinkTarget {
        match self {
            SinkKind::Csv => SinkTarget::Csv,
            SinkKind::Sheet => SinkTarget::Sheet { clear },
            SinkKind::Drive => SinkTarget::Drive,
        }
    }
}
