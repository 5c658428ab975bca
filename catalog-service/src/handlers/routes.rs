//! Axum handlers for the catalog collections
//!
//! The same five handlers serve every collection; the entity type picks the
//! repository out of [`AppState`] and the DTOs through [`WireEntity`].

use std::sync::Arc;

use axum::{
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    config::Config,
    health,
    model::{Author, Book, Category},
    repository::{References, RelationLoader, Repository, SqlRepository},
    state::AppState,
};

use super::dto::{PageResponse, WireEntity};
use super::error::{ApiError, ApiOperation};
use super::query::PageQuery;

/// Full application router with state attached
pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(collection_routes::<Author>("/authors"))
        .merge(collection_routes::<Category>("/categories"))
        .merge(collection_routes::<Book>("/books"))
        .route("/authors/{id}/books", get(related::<Author, Book>))
        .route("/categories/{id}/books", get(related::<Category, Book>))
        .route("/health", get(health::health))
        .route("/ready", get(health::readiness))
        .with_state(state)
}

/// List, get, create, update and delete under `base`
pub fn collection_routes<E>(base: &str) -> Router<AppState>
where
    E: WireEntity,
    SqlRepository<E>: FromRef<AppState>,
{
    let item = format!("{}/{{id}}", base);
    Router::new()
        .route(base, get(list::<E>).post(create::<E>).put(update::<E>))
        .route(&item, get(get_one::<E>).delete(delete::<E>))
}

async fn list<E: WireEntity>(
    State(repository): State<SqlRepository<E>>,
    State(config): State<Arc<Config>>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageResponse<E::Dto>>, ApiError> {
    let page_size = query.page_size(config.pagination.default_page_size);
    let list = repository.list(query.page_number(), page_size).await?;
    Ok(Json(PageResponse::from_list(list)))
}

async fn get_one<E: WireEntity>(
    State(repository): State<SqlRepository<E>>,
    Path(id): Path<i64>,
) -> Result<Json<E::Dto>, ApiError> {
    let entity = repository
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found(E::DESCRIPTOR.name, id))?;
    Ok(Json(entity.to_dto()))
}

async fn create<E: WireEntity>(
    State(repository): State<SqlRepository<E>>,
    Json(body): Json<E::CreateDto>,
) -> Result<Json<E::Dto>, ApiError> {
    let draft = E::draft_from(body)?;
    let created = repository.create(draft).await?;
    tracing::info!(entity = E::DESCRIPTOR.name, id = created.id(), "Created");
    Ok(Json(created.to_dto()))
}

async fn update<E: WireEntity>(
    State(repository): State<SqlRepository<E>>,
    Json(body): Json<E::UpdateDto>,
) -> Result<Json<E::Dto>, ApiError> {
    let entity = E::entity_from(body)?;
    let updated = repository.update(entity).await?;
    tracing::info!(entity = E::DESCRIPTOR.name, id = updated.id(), "Updated");
    Ok(Json(updated.to_dto()))
}

async fn delete<E: WireEntity>(
    State(repository): State<SqlRepository<E>>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    repository.delete(id).await?;
    tracing::info!(entity = E::DESCRIPTOR.name, id, "Deleted");
    Ok(StatusCode::OK)
}

/// Children of one parent, 404 when the parent is absent
async fn related<P, C>(
    State(parents): State<SqlRepository<P>>,
    State(children): State<SqlRepository<C>>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<C::Dto>>, ApiError>
where
    P: WireEntity,
    C: WireEntity + References<P>,
{
    if parents.get_by_id(id).await?.is_none() {
        return Err(
            ApiError::not_found(P::DESCRIPTOR.name, id).with_operation(ApiOperation::ListRelated)
        );
    }

    let items = RelationLoader::<P, C>::load_many(&children, id).await?;
    Ok(Json(items.into_iter().map(C::to_dto).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::connect_in_memory;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let pool = connect_in_memory().await.unwrap();
        router(AppState::new(Config::default(), pool))
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_create_and_get_author() {
        let app = app().await;
        let (status, created) =
            send(&app, Method::POST, "/authors", Some(json!({"name": "Italo Calvino"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(created["name"], "Italo Calvino");

        let uri = format!("/authors/{}", created["id"]);
        let (status, fetched) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_get_missing_is_404() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/categories/77", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
        assert_eq!(body["entityType"], "Category");
        assert_eq!(body["entityId"], 77);
    }

    #[tokio::test]
    async fn test_create_validation_errors() {
        let app = app().await;
        let (status, body) = send(&app, Method::POST, "/authors", Some(json!({"name": ""}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["errors"]["name"][0]["message"], "Name is required");

        let long = "n".repeat(51);
        let (status, body) =
            send(&app, Method::POST, "/categories", Some(json!({"name": long}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["errors"]["name"][0]["message"], "Name maximum length is 50");
    }

    #[tokio::test]
    async fn test_list_uses_default_page_size() {
        let app = app().await;
        for i in 0..12 {
            send(&app, Method::POST, "/categories", Some(json!({"name": format!("Shelf {}", i)}))).await;
        }

        let (status, page) = send(&app, Method::GET, "/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["items"].as_array().unwrap().len(), 10);
        assert_eq!(page["page"], 1);
        assert_eq!(page["totalPages"], 2);

        let (_, page) = send(&app, Method::GET, "/categories?page=2&nr=10", None).await;
        assert_eq!(page["items"].as_array().unwrap().len(), 2);
        assert_eq!(page["items"][0]["name"], "Shelf 10");
    }

    #[tokio::test]
    async fn test_list_rejects_zero_page() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/books?page=0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_400() {
        let app = app().await;
        let (status, body) = send(
            &app,
            Method::PUT,
            "/authors",
            Some(json!({"id": 41, "name": "Nobody"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["operation"], "update");
        assert_eq!(body["entityId"], 41);
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_400() {
        let app = app().await;
        let (status, _) = send(&app, Method::DELETE, "/books/5", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_related_books_for_missing_author_is_404() {
        let app = app().await;
        let (status, body) = send(&app, Method::GET, "/authors/3/books", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["operation"], "list_related");
    }
}
