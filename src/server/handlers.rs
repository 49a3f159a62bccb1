// API Handlers - one per resource action
// Each handler parses its input explicitly, then makes one call into the record store.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Json;

use crate::bull::{Bull, BullAttributes};
use crate::db::BullStore;
use crate::server::error::ApiError;
use crate::server::params::parse_bull_params;
use crate::server::{ApiResponse, AppState};

const CREATED: &str = "Bull was successfully created.";
const UPDATED: &str = "Bull was successfully updated.";
const DESTROYED: &str = "Bull was successfully destroyed.";

/// Response flavour requested by the client.
///
/// JSON clients get resource bodies; form posts and plain browsers get redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Html,
}

impl Format {
    pub fn negotiate(headers: &HeaderMap) -> Self {
        let mentions_json = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_ascii_lowercase().contains("application/json"))
                .unwrap_or(false)
        };

        if mentions_json(header::ACCEPT) || mentions_json(header::CONTENT_TYPE) {
            Format::Json
        } else {
            Format::Html
        }
    }
}

fn redirect_with_notice(path: &str, notice: &str) -> Response {
    let target = serde_urlencoded::to_string([("notice", notice)])
        .map(|query| format!("{}?{}", path, query))
        .unwrap_or_else(|_| path.to_string());

    Redirect::to(&target).into_response()
}

fn bull_path(bull: &Bull) -> String {
    format!("/bulls/{}", bull.id)
}

// ============================================================================
// Read-only actions
// ============================================================================

/// GET /health - Health check
pub async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /bulls - All bulls
pub async fn index(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Bull>>>, ApiError> {
    let bulls = state.store.lock().await.all()?;
    Ok(Json(ApiResponse::ok(bulls)))
}

/// GET /bulls/:id
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Bull>>, ApiError> {
    let bull = state.store.lock().await.find(id)?;
    Ok(Json(ApiResponse::ok(bull)))
}

/// GET /bulls/new - Blank attributes for a new-bull form
pub async fn new_bull() -> Json<ApiResponse<BullAttributes>> {
    Json(ApiResponse::ok(BullAttributes::default()))
}

/// GET /bulls/:id/edit - Current attributes for an edit form
pub async fn edit(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<BullAttributes>>, ApiError> {
    let bull = state.store.lock().await.find(id)?;
    Ok(Json(ApiResponse::ok(bull.attributes())))
}

// ============================================================================
// Mutating actions
// ============================================================================

/// POST /bulls
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let attrs = parse_bull_params(&headers, &body)?.into_attributes()?;
    let bull = state.store.lock().await.create(&attrs)?;
    log::info!("Created bull {} ({})", bull.id, bull.name);

    let location = bull_path(&bull);
    Ok(match Format::negotiate(&headers) {
        Format::Json => (
            StatusCode::CREATED,
            [(header::LOCATION, location)],
            Json(ApiResponse::ok(bull).with_notice(CREATED)),
        )
            .into_response(),
        Format::Html => redirect_with_notice(&location, CREATED),
    })
}

/// PATCH/PUT /bulls/:id
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let attrs = parse_bull_params(&headers, &body)?.into_attributes()?;
    let bull = state.store.lock().await.update(id, &attrs)?;
    log::info!("Updated bull {}", bull.id);

    Ok(match Format::negotiate(&headers) {
        Format::Json => Json(ApiResponse::ok(bull).with_notice(UPDATED)).into_response(),
        Format::Html => redirect_with_notice(&bull_path(&bull), UPDATED),
    })
}

/// DELETE /bulls/:id
pub async fn destroy(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    state.store.lock().await.delete(id)?;
    log::info!("Destroyed bull {}", id);

    Ok(match Format::negotiate(&headers) {
        Format::Json => StatusCode::NO_CONTENT.into_response(),
        Format::Html => redirect_with_notice("/bulls", DESTROYED),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteBullStore;
    use crate::server::{router, AppState};
    use axum::body::Body;
    use axum::http::{Method, Request};
    use axum::Router;
    use chrono::NaiveDate;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    struct TestApp {
        state: AppState,
        router: Router,
    }

    impl TestApp {
        /// Fresh in-memory store seeded with one bull (id 1).
        async fn new() -> Self {
            let store = SqliteBullStore::open_in_memory().unwrap();
            store
                .create(
                    &BullAttributes::new("Zero")
                        .with_registration_code("000")
                        .with_born_on(NaiveDate::from_ymd_opt(2012, 2, 12).unwrap())
                        .with_offspring_count(0),
                )
                .unwrap();
            let state = AppState::new(store);
            let router = router(state.clone());
            TestApp { state, router }
        }

        async fn count(&self) -> i64 {
            self.state.store.lock().await.count().unwrap()
        }

        async fn send(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let headers = response.headers().clone();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, headers, body)
        }

        async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Value) {
            self.send(Request::get(uri).body(Body::empty()).unwrap()).await
        }

        async fn json(
            &self,
            method: Method,
            uri: &str,
            body: Value,
        ) -> (StatusCode, HeaderMap, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::ACCEPT, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }

        async fn form(
            &self,
            method: Method,
            uri: &str,
            body: &str,
        ) -> (StatusCode, HeaderMap, Value) {
            let request = Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap();
            self.send(request).await
        }
    }

    fn location(headers: &HeaderMap) -> &str {
        headers.get(header::LOCATION).unwrap().to_str().unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new().await;
        let (status, _, body) = app.get("/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], "OK");
    }

    #[tokio::test]
    async fn test_index() {
        let app = TestApp::new().await;
        let (status, _, body) = app.get("/bulls").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["name"], "Zero");
        assert_eq!(body["data"][0]["born_on"], "2012-02-12");
    }

    #[tokio::test]
    async fn test_new_and_edit_forms() {
        let app = TestApp::new().await;

        let (status, _, body) = app.get("/bulls/new").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], Value::Null);

        let (status, _, body) = app.get("/bulls/1/edit").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Zero");
        assert_eq!(body["data"]["registration_code"], "000");
    }

    #[tokio::test]
    async fn test_show_and_missing() {
        let app = TestApp::new().await;

        let (status, _, body) = app.get("/bulls/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["id"], 1);

        let (status, _, body) = app.get("/bulls/99").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_create_from_form_redirects_to_bull() {
        let app = TestApp::new().await;

        let (status, headers, _) = app
            .form(
                Method::POST,
                "/bulls",
                "bull%5Bname%5D=One&bull%5Bborn_on%5D=2015-03-01&bull%5Boffspring_count%5D=4",
            )
            .await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            location(&headers),
            "/bulls/2?notice=Bull+was+successfully+created."
        );
        assert_eq!(app.count().await, 2);
    }

    #[tokio::test]
    async fn test_create_from_json() {
        let app = TestApp::new().await;

        let (status, headers, body) = app
            .json(
                Method::POST,
                "/bulls",
                json!({"bull": {
                    "name": "One",
                    "born_on": "2015-03-01",
                    "offspring_count": 4,
                    "registration_code": "001"
                }}),
            )
            .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(location(&headers), "/bulls/2");
        assert_eq!(body["data"]["name"], "One");
        assert_eq!(body["data"]["registration_code"], "001");
        assert_eq!(body["data"]["offspring_count"], 4);
        assert_eq!(body["notice"], CREATED);
        assert_eq!(app.count().await, 2);
    }

    #[tokio::test]
    async fn test_create_without_name_is_unprocessable() {
        let app = TestApp::new().await;

        let (status, _, body) = app
            .json(Method::POST, "/bulls", json!({"bull": {"offspring_count": 4}}))
            .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["name"][0], "can't be blank");
        assert_eq!(app.count().await, 1);
    }

    #[tokio::test]
    async fn test_create_without_bull_param_is_bad_request() {
        let app = TestApp::new().await;

        let (status, _, _) = app.json(Method::POST, "/bulls", json!({"name": "One"})).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(app.count().await, 1);
    }

    #[tokio::test]
    async fn test_update_from_form_redirects_to_bull() {
        let app = TestApp::new().await;

        let (status, headers, _) = app
            .form(Method::PATCH, "/bulls/1", "bull%5Bname%5D=Zero+Renamed")
            .await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            location(&headers),
            "/bulls/1?notice=Bull+was+successfully+updated."
        );
        let bull = app.state.store.lock().await.find(1).unwrap();
        assert_eq!(bull.name, "Zero Renamed");
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let app = TestApp::new().await;

        let (status, _, body) = app
            .json(Method::PUT, "/bulls/1", json!({"bull": {"offspring_count": 9}}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["offspring_count"], 9);
        assert_eq!(body["data"]["name"], "Zero");
        assert_eq!(body["data"]["registration_code"], "000");
        assert_eq!(body["data"]["born_on"], "2012-02-12");
    }

    #[tokio::test]
    async fn test_form_update_with_blank_fields_clears_them() {
        let app = TestApp::new().await;

        let (status, headers, _) = app
            .form(
                Method::PATCH,
                "/bulls/1",
                "bull%5Bregistration_code%5D=&bull%5Bname%5D=Zero\
                 &bull%5Bborn_on%5D=&bull%5Boffspring_count%5D=",
            )
            .await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            location(&headers),
            "/bulls/1?notice=Bull+was+successfully+updated."
        );
        let bull = app.state.store.lock().await.find(1).unwrap();
        assert_eq!(bull.name, "Zero");
        assert_eq!(bull.registration_code, None);
        assert_eq!(bull.born_on, None);
        assert_eq!(bull.offspring_count, None);
    }

    #[tokio::test]
    async fn test_json_update_with_null_clears_the_field() {
        let app = TestApp::new().await;

        let (status, _, body) = app
            .json(Method::PATCH, "/bulls/1", json!({"bull": {"born_on": null}}))
            .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["born_on"], Value::Null);
        assert_eq!(body["data"]["registration_code"], "000");
        assert_eq!(body["data"]["offspring_count"], 0);

        let (_, _, body) = app
            .json(
                Method::PATCH,
                "/bulls/1",
                json!({"bull": {"registration_code": "", "offspring_count": null}}),
            )
            .await;
        assert_eq!(body["data"]["registration_code"], Value::Null);
        assert_eq!(body["data"]["offspring_count"], Value::Null);

        let (_, _, body) = app.get("/bulls/1").await;
        assert_eq!(body["data"]["born_on"], Value::Null);
        assert_eq!(body["data"]["registration_code"], Value::Null);
        assert_eq!(body["data"]["offspring_count"], Value::Null);
        assert_eq!(body["data"]["name"], "Zero");
    }

    #[tokio::test]
    async fn test_update_invalid_and_missing() {
        let app = TestApp::new().await;

        let (status, _, body) = app
            .json(Method::PATCH, "/bulls/1", json!({"bull": {"born_on": "soon"}}))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["errors"]["born_on"][0], "is not a valid date");

        let (status, _, _) = app
            .json(Method::PATCH, "/bulls/99", json!({"bull": {"name": "Ghost"}}))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_destroy_redirects_to_index() {
        let app = TestApp::new().await;

        let request = Request::delete("/bulls/1").body(Body::empty()).unwrap();
        let (status, headers, _) = app.send(request).await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(
            location(&headers),
            "/bulls?notice=Bull+was+successfully+destroyed."
        );
        assert_eq!(app.count().await, 0);
    }

    #[tokio::test]
    async fn test_destroy_json_then_show_is_not_found() {
        let app = TestApp::new().await;

        let request = Request::delete("/bulls/1")
            .header(header::ACCEPT, "application/json")
            .body(Body::empty())
            .unwrap();
        let (status, _, body) = app.send(request).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);

        let (status, _, _) = app.get("/bulls/1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_format_negotiation() {
        let mut headers = HeaderMap::new();
        assert_eq!(Format::negotiate(&headers), Format::Html);

        headers.insert(header::ACCEPT, "application/json, text/plain".parse().unwrap());
        assert_eq!(Format::negotiate(&headers), Format::Json);
    }
}
