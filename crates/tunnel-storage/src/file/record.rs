use serde::Serialize;
use serde_json::Value;
use tunnel_core::{Result, StorageError, Url, User};

/// One line of the log: `{"type": "url"|"user", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum Record {
    Url(Url),
    User(User),
}

impl Record {
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| StorageError::InvalidData(e.to_string()))
    }

    /// Parses a log line.
    ///
    /// Lines without a `type` are URL records and lines without a `data`
    /// envelope carry the entity at the top level; both shapes predate the
    /// envelope and still appear in old logs.
    pub fn decode(line: &str) -> Result<Record> {
        let mut value: Value = serde_json::from_str(line).map_err(|e| invalid(line, e))?;

        let kind = match value.get("type") {
            None => "url".to_string(),
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => {
                return Err(StorageError::InvalidData(format!(
                    "record type is not a string: {other}"
                )))
            }
        };

        let data = match value.get_mut("data").map(Value::take) {
            Some(data) => data,
            None => value,
        };

        match kind.as_str() {
            "url" => serde_json::from_value(data)
                .map(Record::Url)
                .map_err(|e| invalid(line, e)),
            "user" => serde_json::from_value(data)
                .map(Record::User)
                .map_err(|e| invalid(line, e)),
            other => Err(StorageError::InvalidData(format!(
                "unknown record type: {other}"
            ))),
        }
    }
}

fn invalid(line: &str, err: serde_json::Error) -> StorageError {
    StorageError::InvalidData(format!("{err}: {line}"))
}
