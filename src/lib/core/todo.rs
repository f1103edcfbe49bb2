use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::error::StoreError;
use crate::core::mapper::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Pending,
    Completed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Status::Pending),
            "completed" => Some(Status::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
}

impl Todo {
    /// Builds a typed todo from a mapped row. Columns outside the fixed
    /// field set, or values of the wrong type, are a row-shape error.
    pub fn from_record(record: Record) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(record))
            .map_err(|e| StoreError::RowShape(e.to_string()))
    }
}
