//! Request validation.
//!
//! Every validator is a pure function returning either the normalized value or
//! a [`Rejection`] listing what was wrong with each offending field. Handlers
//! decide which status code a rejection maps to.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::core::todo::{Status, Todo};

pub const TITLE_MAX_CHARS: usize = 100;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rejection {
    pub fields: Vec<FieldError>,
}

impl Rejection {
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut rejection = Self::default();
        rejection.push(field, message);
        rejection
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.fields.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    fn into_result<T>(self, value: T) -> Result<T, Rejection> {
        if self.fields.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub q: String,
    pub skip: i64,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            q: String::new(),
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Fields accepted on create, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTodo {
    pub title: String,
    pub description: Option<String>,
    pub status: Status,
}

/// Fields supplied on update. `description: Some(None)` clears it.
///
/// A JSON `null` is not treated as "keep the current value": `null` for
/// `title` or `status` is a 422, and `description: null` clears the
/// description. Only an absent key leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<Status>,
}

impl TodoPatch {
    pub fn merge(self, current: Todo) -> Todo {
        Todo {
            id: current.id,
            title: self.title.unwrap_or(current.title),
            description: self.description.unwrap_or(current.description),
            status: self.status.unwrap_or(current.status),
        }
    }
}

pub fn validate_list_query(params: &HashMap<String, String>) -> Result<ListQuery, Rejection> {
    let mut rejection = Rejection::default();
    let mut query = ListQuery::default();

    if let Some(q) = params.get("q") {
        query.q = q.clone();
    }
    if let Some(raw) = params.get("skip") {
        match raw.parse::<i64>() {
            Ok(skip) if skip >= 0 => query.skip = skip,
            Ok(_) => rejection.push("skip", "must be greater than or equal to 0"),
            Err(_) => rejection.push("skip", "must be an integer"),
        }
    }
    if let Some(raw) = params.get("limit") {
        match raw.parse::<i64>() {
            Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => query.limit = limit,
            Ok(_) => rejection.push("limit", format!("must be between 1 and {MAX_LIMIT}")),
            Err(_) => rejection.push("limit", "must be an integer"),
        }
    }

    rejection.into_result(query)
}

pub fn validate_id(raw: &str) -> Result<i64, Rejection> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        Ok(_) => Err(Rejection::single("id", "must be a positive integer")),
        Err(_) => Err(Rejection::single("id", "must be an integer")),
    }
}

/// Bodies must be JSON objects before any field rule applies.
pub fn expect_object(body: Value) -> Result<Map<String, Value>, Rejection> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(Rejection::single("body", "must be a JSON object")),
    }
}

fn check_title(value: &Value, rejection: &mut Rejection) -> Option<String> {
    match value {
        Value::String(title) if title.is_empty() => {
            rejection.push("title", "must not be empty");
            None
        }
        Value::String(title) if title.chars().count() > TITLE_MAX_CHARS => {
            rejection.push("title", format!("must be at most {TITLE_MAX_CHARS} characters"));
            None
        }
        Value::String(title) => Some(title.clone()),
        _ => {
            rejection.push("title", "must be a string");
            None
        }
    }
}

fn check_description(value: &Value, rejection: &mut Rejection) -> Option<Option<String>> {
    match value {
        Value::Null => Some(None),
        Value::String(description) => Some(Some(description.clone())),
        _ => {
            rejection.push("description", "must be a string or null");
            None
        }
    }
}

fn check_status(value: &Value, rejection: &mut Rejection) -> Option<Status> {
    let status = value.as_str().and_then(Status::parse);
    if status.is_none() {
        rejection.push("status", "must be one of: pending, completed");
    }
    status
}

pub fn validate_new_todo(body: &Map<String, Value>) -> Result<NewTodo, Rejection> {
    let mut rejection = Rejection::default();

    let title = match body.get("title") {
        Some(value) => check_title(value, &mut rejection),
        None => {
            rejection.push("title", "is required");
            None
        }
    };
    let description = body
        .get("description")
        .and_then(|value| check_description(value, &mut rejection))
        .flatten();
    let status = match body.get("status") {
        Some(value) => check_status(value, &mut rejection),
        None => Some(Status::default()),
    };

    match (title, status) {
        (Some(title), Some(status)) if rejection.fields.is_empty() => Ok(NewTodo {
            title,
            description,
            status,
        }),
        _ => Err(rejection),
    }
}

pub fn validate_patch(body: &Map<String, Value>) -> Result<TodoPatch, Rejection> {
    let mut rejection = Rejection::default();
    let patch = TodoPatch {
        title: body
            .get("title")
            .and_then(|value| check_title(value, &mut rejection)),
        description: body
            .get("description")
            .and_then(|value| check_description(value, &mut rejection)),
        status: body
            .get("status")
            .and_then(|value| check_status(value, &mut rejection)),
    };
    rejection.into_result(patch)
}
