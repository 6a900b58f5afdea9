//! Analysis pipeline stages after grouping and classification:
//!
//! - **summary**: one scored record per case.
//! - **report**: partitions and headline KPIs of a single run.
//! - **trend**: outer join of two runs' actionable cases.
//! - **verdict**: qualitative reading of the trend KPIs.

pub mod report;
pub mod summary;
pub mod trend;
pub mod verdict;
