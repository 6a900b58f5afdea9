pub mod csv_import;
pub mod normalizer;
pub mod report_writer;
pub mod summary_store;
pub mod timestamp;

pub use csv_import::{CsvImporter, RawRow, RawTable};
pub use normalizer::{InvalidReason, InvalidRow, NormalizedBatch, RowNormalizer};
pub use report_writer::ReportWriter;
pub use summary_store::{load_summary, parse_summary, read_header, save_summary};
pub use timestamp::parse_timestamp;
