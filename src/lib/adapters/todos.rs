use std::collections::HashMap;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};

#[cfg(feature = "tracing")]
use tracing::{info, instrument};

use crate::adapters::http::AppState;
use crate::core::{
    expect_object, to_array, to_object, validate_id, validate_list_query, validate_new_todo,
    validate_patch, ApiError, ListQuery, Rejection, ResultSet, StoreError, Todo,
};
use crate::storage::Store;

const SELECT_BY_ID: &str = "SELECT id, title, description, status FROM todos WHERE id = ?";
const SELECT_PAGE: &str =
    "SELECT id, title, description, status FROM todos ORDER BY id LIMIT ? OFFSET ?";
const SEARCH_TITLE: &str =
    "SELECT id, title, description, status FROM todos WHERE title LIKE ? ESCAPE '\\' ORDER BY id";
const INSERT: &str = "INSERT INTO todos (title, description, status) VALUES (?, ?, ?)";
const UPDATE: &str = "UPDATE todos SET title = ?, description = ?, status = ? WHERE id = ?";
const DELETE: &str = "DELETE FROM todos WHERE id = ?";

pub const DELETED_DETAIL: &str = "Todo deleted";

/// Routes relative to wherever the caller nests them.
pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_todos).post(create_todo))
        .route("/search/all", get(search_todos))
        .route("/{id}", get(get_todo).put(update_todo).delete(delete_todo))
}

fn list_params(
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<ListQuery, ApiError> {
    let Query(params) = params
        .map_err(|e| ApiError::BadRequest(Rejection::single("query", e.body_text())))?;
    validate_list_query(&params).map_err(ApiError::BadRequest)
}

fn id_param(id: Result<Path<String>, PathRejection>) -> Result<i64, ApiError> {
    let Path(raw) = id.map_err(|e| ApiError::BadRequest(Rejection::single("id", e.body_text())))?;
    validate_id(&raw).map_err(ApiError::BadRequest)
}

fn json_object(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<serde_json::Map<String, Value>, ApiError> {
    let Json(body) = body.map_err(|e| match e {
        JsonRejection::JsonSyntaxError(_)
        | JsonRejection::JsonDataError(_)
        | JsonRejection::MissingJsonContentType(_) => {
            ApiError::BadRequest(Rejection::single("body", e.body_text()))
        }
        // oversized or unreadable bodies keep the status axum assigned
        other => ApiError::Body {
            status: other.status(),
            message: other.body_text(),
        },
    })?;
    expect_object(body).map_err(ApiError::BadRequest)
}

fn to_todos(rows: &ResultSet) -> Result<Vec<Todo>, StoreError> {
    to_array(rows).into_iter().map(Todo::from_record).collect()
}

async fn find_todo(store: &dyn Store, id: i64) -> Result<Option<Todo>, StoreError> {
    let rows = store.query(SELECT_BY_ID, &[id.into()]).await?;
    to_object(&rows).map(Todo::from_record).transpose()
}

/// LIKE treats `%` and `_` as wildcards; the search term is matched literally.
fn like_pattern(q: &str) -> String {
    let mut escaped = String::with_capacity(q.len() + 2);
    escaped.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub async fn list_todos(
    State(state): State<AppState>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let query = list_params(params)?;
    let store = state.store.acquire().await?;
    let rows = store
        .query(SELECT_PAGE, &[query.limit.into(), query.skip.into()])
        .await?;
    Ok(Json(to_todos(&rows)?))
}

#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub async fn get_todo(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = id_param(id)?;
    let store = state.store.acquire().await?;
    let todo = find_todo(store.as_ref(), id).await?.ok_or(ApiError::NotFound)?;
    Ok(Json(todo))
}

#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub async fn create_todo(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let body = json_object(body)?;
    let new = validate_new_todo(&body).map_err(ApiError::Unprocessable)?;

    let store = state.store.acquire().await?;
    let outcome = store
        .execute(
            INSERT,
            &[new.title.into(), new.description.into(), new.status.as_str().into()],
        )
        .await?;
    let todo = find_todo(store.as_ref(), outcome.last_insert_id)
        .await?
        .ok_or_else(|| {
            StoreError::RowShape(format!("inserted row {} not readable", outcome.last_insert_id))
        })?;
    store.persist().await?;

    #[cfg(feature = "tracing")]
    info!(id = todo.id, "Todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub async fn update_todo(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Todo>, ApiError> {
    let id = id_param(id)?;
    let body = json_object(body)?;
    let patch = validate_patch(&body).map_err(ApiError::Unprocessable)?;

    let store = state.store.acquire().await?;
    let current = find_todo(store.as_ref(), id).await?.ok_or(ApiError::NotFound)?;
    let merged = patch.merge(current);
    let outcome = store
        .execute(
            UPDATE,
            &[
                merged.title.into(),
                merged.description.into(),
                merged.status.as_str().into(),
                id.into(),
            ],
        )
        .await?;
    // deleted by a concurrent request since the lookup
    if outcome.rows_affected == 0 {
        return Err(ApiError::NotFound);
    }
    let todo = find_todo(store.as_ref(), id).await?.ok_or(ApiError::NotFound)?;
    store.persist().await?;

    #[cfg(feature = "tracing")]
    info!(id, "Todo updated");
    Ok(Json(todo))
}

#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub async fn delete_todo(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<Value>, ApiError> {
    let id = id_param(id)?;
    let store = state.store.acquire().await?;
    if find_todo(store.as_ref(), id).await?.is_none() {
        return Err(ApiError::NotFound);
    }
    let outcome = store.execute(DELETE, &[id.into()]).await?;
    if outcome.rows_affected == 0 {
        return Err(ApiError::NotFound);
    }
    store.persist().await?;

    #[cfg(feature = "tracing")]
    info!(id, "Todo deleted");
    Ok(Json(json!({ "detail": DELETED_DETAIL })))
}

#[cfg_attr(feature = "tracing", instrument(skip_all))]
pub async fn search_todos(
    State(state): State<AppState>,
    params: Result<Query<HashMap<String, String>>, QueryRejection>,
) -> Result<Json<Vec<Todo>>, ApiError> {
    let query = list_params(params)?;
    let store = state.store.acquire().await?;
    let rows = store
        .query(SEARCH_TITLE, &[like_pattern(&query.q).into()])
        .await?;
    Ok(Json(to_todos(&rows)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("milk"), "%milk%");
        assert_eq!(like_pattern("100%_\\"), "%100\\%\\_\\\\%");
    }
}
