pub mod census;
pub mod context;
pub mod export;
pub mod ioutil;
pub mod progress;
pub mod reconcile;
pub mod report;
pub mod timeseries;
pub mod workbook;

pub use census::{extract_workbook, parse_workbook, ParseError, Snapshot, WorkbookContext};
pub use context::{clean_rut, normalize_name, BedType, EventStatus, SnapshotStatus};
pub use export::{patient_row, write_report_csv, REPORT_COLUMNS};
pub use ioutil::slurp_magic;
pub use progress::{default_output, ProgressSink};
pub use reconcile::{reconcile, Event};
pub use report::{
	monthly_reports, monthly_reports_capped, quarterly_report, range_report, report_for_period,
	yearly_report, DailyStats, Report, MONTHLY_REPORT_CAP,
};
pub use workbook::{Cell, Sheet, Workbook};
