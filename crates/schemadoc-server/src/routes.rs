//! HTTP routes over the sync engine

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use schemadoc_core::{Domain, DomainTableLink};
use schemadoc_sync::{ColumnAnnotation, DiffResult, Dictionary, SyncEngine, SyncOutcome};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::{ApiError, ApiResult};

type AppState = Arc<SyncEngine>;

pub fn router(engine: Arc<SyncEngine>) -> Router {
    Router::new()
        .route("/", get(dictionary))
        .route("/update", post(update))
        .route("/check-changes", get(check_changes))
        .route("/sync-db", post(sync_db))
        .route("/create-domain", post(create_domain))
        .route("/get-domains", get(get_domains))
        .route("/link-table-with-domain", post(link_table_with_domain))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

#[derive(Debug, Deserialize)]
pub struct UpdateRequest {
    pub table_id: String,
    #[serde(default)]
    pub table_description: String,
    #[serde(default)]
    pub columns_data: Vec<ColumnAnnotation>,
}

#[derive(Debug, Serialize)]
pub struct CheckChangesResponse {
    #[serde(flatten)]
    pub diff: DiffResult,
    pub has_changes: bool,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateDomainRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub table_id: String,
    pub domain_name: String,
}

async fn dictionary(State(engine): State<AppState>) -> ApiResult<Json<Dictionary>> {
    Ok(Json(engine.dictionary().await?))
}

async fn update(
    State(engine): State<AppState>,
    Json(request): Json<UpdateRequest>,
) -> ApiResult<StatusCode> {
    let table_id = request.table_id.trim();
    if table_id.is_empty() {
        return Err(ApiError::BadRequest("table_id is required".to_string()));
    }
    engine
        .annotate(table_id, &request.table_description, &request.columns_data)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn check_changes(State(engine): State<AppState>) -> ApiResult<Json<CheckChangesResponse>> {
    let diff = engine.check_changes().await?;
    Ok(Json(CheckChangesResponse {
        has_changes: !diff.is_empty(),
        summary: diff.summary(),
        diff,
    }))
}

async fn sync_db(State(engine): State<AppState>) -> ApiResult<Json<SyncOutcome>> {
    let outcome = engine.apply_sync().await?;
    tracing::info!(
        tables_added = outcome.report.tables_added,
        tables_removed = outcome.report.tables_removed,
        columns_replaced = outcome.report.columns_replaced,
        "sync applied"
    );
    Ok(Json(outcome))
}

async fn create_domain(
    State(engine): State<AppState>,
    Json(request): Json<CreateDomainRequest>,
) -> ApiResult<(StatusCode, Json<Domain>)> {
    let domain = Domain {
        name: request.name.trim().to_string(),
        description: request.description.trim().to_string(),
    };
    if domain.name.is_empty() || domain.description.is_empty() {
        return Err(ApiError::BadRequest(
            "domain name and description are required".to_string(),
        ));
    }
    engine.create_domain(&domain).await?;
    Ok((StatusCode::CREATED, Json(domain)))
}

async fn get_domains(State(engine): State<AppState>) -> ApiResult<Json<Vec<Domain>>> {
    Ok(Json(engine.domains().await?))
}

async fn link_table_with_domain(
    State(engine): State<AppState>,
    Json(request): Json<LinkRequest>,
) -> ApiResult<Json<DomainTableLink>> {
    let table_id = request.table_id.trim();
    let domain_name = request.domain_name.trim();
    if table_id.is_empty() || domain_name.is_empty() {
        return Err(ApiError::BadRequest(
            "table_id and domain_name are required".to_string(),
        ));
    }
    Ok(Json(engine.link_table_with_domain(table_id, domain_name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use pretty_assertions::assert_eq;
    use schemadoc_core::{ConnectionIdentity, Dialect};
    use schemadoc_store::JsonFileStore;
    use schemadoc_sync::testing::MockCatalog;
    use schemadoc_sync::{SchemaIntrospector, SyncOptions};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    struct TestApp {
        _dir: tempfile::TempDir,
        catalog: Arc<MockCatalog>,
        router: Router,
    }

    async fn app() -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let catalog = Arc::new(MockCatalog::shop());
        let introspector = Arc::new(SchemaIntrospector::new(catalog.clone(), "public").unwrap());
        let store = Arc::new(JsonFileStore::open(dir.path()).await.unwrap());
        let engine = Arc::new(SyncEngine::new(introspector, store, SyncOptions::default()));
        let identity = ConnectionIdentity {
            user: "admin".into(),
            password: "secret".into(),
            host: "localhost".into(),
            port: 5432,
            name: "shop".into(),
            driver: Dialect::Postgres,
            schema: "public".into(),
        };
        engine.bootstrap(&identity, false).await.unwrap();
        TestApp {
            _dir: dir,
            catalog,
            router: router(engine),
        }
    }

    async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                request = request.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn test_index_lists_tables_without_password() {
        let app = app().await;
        let (status, body) = send(&app.router, "GET", "/", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tables"].as_array().unwrap().len(), 3);
        assert_eq!(body["database"]["name"], "shop");
        assert!(body["database"].get("password").is_none());
    }

    #[tokio::test]
    async fn test_update_sets_descriptions() {
        let app = app().await;
        let (_, body) = send(&app.router, "GET", "/", None).await;
        let product = body["tables"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == "product")
            .unwrap()
            .clone();
        let col_id = product["columns"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app.router,
            "POST",
            "/update",
            Some(json!({
                "table_id": "product",
                "table_description": "Sellable items",
                "columns_data": [{"col_id": col_id, "description": "Primary key"}],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app.router, "GET", "/", None).await;
        let product = body["tables"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == "product")
            .unwrap()
            .clone();
        assert_eq!(product["description"], "Sellable items");
        let column = product["columns"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["id"] == col_id.as_str())
            .unwrap()
            .clone();
        assert_eq!(column["description"], "Primary key");
    }

    #[tokio::test]
    async fn test_update_unknown_table_is_not_found() {
        let app = app().await;
        let (status, body) = send(
            &app.router,
            "POST",
            "/update",
            Some(json!({"table_id": "missing", "table_description": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_update_rejects_column_of_other_table() {
        let app = app().await;
        let (_, body) = send(&app.router, "GET", "/", None).await;
        let order = body["tables"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == "order")
            .unwrap()
            .clone();
        let order_col = order["columns"][0]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app.router,
            "POST",
            "/update",
            Some(json!({
                "table_id": "product",
                "table_description": "Sellable items",
                "columns_data": [{"col_id": order_col, "description": "Wrong table"}],
            })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, body) = send(&app.router, "GET", "/", None).await;
        let product = body["tables"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["id"] == "product")
            .unwrap()
            .clone();
        assert_eq!(product["description"], "");
    }

    #[tokio::test]
    async fn test_check_changes_then_sync() {
        let app = app().await;

        let (status, body) = send(&app.router, "GET", "/check-changes", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_changes"], false);
        assert_eq!(body["summary"], "no changes");

        app.catalog.drop_table("order_line");

        let (_, body) = send(&app.router, "GET", "/check-changes", None).await;
        assert_eq!(body["has_changes"], true);
        assert_eq!(body["deleted_tables"], json!(["order_line"]));

        let (status, body) = send(&app.router, "POST", "/sync-db", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["report"]["tables_removed"], 1);

        let (_, body) = send(&app.router, "GET", "/check-changes", None).await;
        assert_eq!(body["has_changes"], false);
    }

    #[tokio::test]
    async fn test_create_domain_trims_and_requires_fields() {
        let app = app().await;

        let (status, body) = send(
            &app.router,
            "POST",
            "/create-domain",
            Some(json!({"name": "  catalog ", "description": " Catalog tables "})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["name"], "catalog");

        let (status, _) = send(
            &app.router,
            "POST",
            "/create-domain",
            Some(json!({"name": "   ", "description": "Blank"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app.router,
            "POST",
            "/create-domain",
            Some(json!({"name": "sales"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app.router, "GET", "/get-domains", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body,
            json!([{"name": "catalog", "description": "Catalog tables"}])
        );
    }

    #[tokio::test]
    async fn test_link_table_with_domain_conflict() {
        let app = app().await;
        for name in ["catalog", "sales"] {
            send(
                &app.router,
                "POST",
                "/create-domain",
                Some(json!({"name": name, "description": "Domain tables"})),
            )
            .await;
        }

        let (status, first) = send(
            &app.router,
            "POST",
            "/link-table-with-domain",
            Some(json!({"table_id": "product", "domain_name": "catalog"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, again) = send(
            &app.router,
            "POST",
            "/link-table-with-domain",
            Some(json!({"table_id": "product", "domain_name": "catalog"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(again["id"], first["id"]);

        let (status, _) = send(
            &app.router,
            "POST",
            "/link-table-with-domain",
            Some(json!({"table_id": "product", "domain_name": "sales"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = send(
            &app.router,
            "POST",
            "/link-table-with-domain",
            Some(json!({"table_id": " ", "domain_name": "sales"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_link_removed_table_is_not_found() {
        let app = app().await;
        send(
            &app.router,
            "POST",
            "/create-domain",
            Some(json!({"name": "sales", "description": "Domain tables"})),
        )
        .await;

        app.catalog.drop_table("order_line");
        let (status, _) = send(&app.router, "POST", "/sync-db", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app.router,
            "POST",
            "/link-table-with-domain",
            Some(json!({"table_id": "order_line", "domain_name": "sales"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].is_string());
    }
}
