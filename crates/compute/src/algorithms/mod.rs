pub mod chronology;
pub mod grouper;
pub mod scoring;
