use thiserror::Error;

#[derive(Error, Debug)]
pub enum TriageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("Serialization error: {0}")]
    Serialize(String),

    #[error("Input is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Input contains no alert rows")]
    EmptyInput,

    #[error("All {0} input rows failed validation")]
    AllRowsInvalid(usize),
}

impl From<serde_json::Error> for TriageError {
    fn from(e: serde_json::Error) -> Self {
        TriageError::Serialize(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TriageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let err = TriageError::MissingColumns(vec!["number".into(), "severity".into()]);
        assert_eq!(err.to_string(), "Input is missing required columns: number, severity");
        assert_eq!(
            TriageError::AllRowsInvalid(3).to_string(),
            "All 3 input rows failed validation"
        );
    }

    #[test]
    fn json_errors_convert() {
        let err: TriageError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(matches!(err, TriageError::Serialize(_)));
    }
}
