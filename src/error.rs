use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Line {line}: column {column} is not a number: {value:?}")]
    InvalidNumeric {
        line: usize,
        column: String,
        value: String,
    },

    #[error("File is empty or has no data rows")]
    EmptyFile,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown dimension: {0}")]
    UnknownDimension(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_columns_message() {
        let err = AppError::MissingColumns(vec!["Order_ID".into(), "Order_Date".into()]);
        assert_eq!(err.to_string(), "Missing required columns: Order_ID, Order_Date");
    }

    #[test]
    fn test_serializes_as_display_string() {
        let err = AppError::Configuration("labels must be one fewer than boundaries".into());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(
            json,
            "\"Configuration error: labels must be one fewer than boundaries\""
        );
    }
}
