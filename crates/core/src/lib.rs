pub mod alert;
pub mod case;
pub mod config;
pub mod error;

pub use alert::*;
pub use case::*;
pub use config::Config;
pub use error::*;
