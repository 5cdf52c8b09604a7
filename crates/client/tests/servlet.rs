use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use medreg_client::{ClientConfig, ClientError, ServletClient};
use medreg_core::{
    ChangeKind, ChangeSet, GridSession, LogNotifier, Row, SaveBatch, SaveReport, SearchQuery,
    SessionConfig,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct Recorded {
    bodies: Arc<Mutex<Vec<Value>>>,
    content_types: Arc<Mutex<Vec<String>>>,
    auth: Arc<Mutex<Vec<Option<String>>>>,
    queries: Arc<Mutex<Vec<HashMap<String, String>>>>,
}

impl Recorded {
    fn headers(&self, headers: &HeaderMap) {
        self.auth.lock().unwrap().push(
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
        if let Some(ct) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) {
            self.content_types.lock().unwrap().push(ct.to_string());
        }
    }
}

async fn save_ok(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    rec.headers(&headers);
    let count = body["patients"].as_array().map_or(0, Vec::len);
    rec.bodies.lock().unwrap().push(body);
    Json(json!({"success": true, "message": format!("{count} row(s) saved")}))
}

async fn save_rejected(State(rec): State<Recorded>, Json(body): Json<Value>) -> Json<Value> {
    rec.bodies.lock().unwrap().push(body);
    Json(json!({"success": false, "error": "AKAN_NO already exists"}))
}

async fn search_ok(
    State(rec): State<Recorded>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    rec.headers(&headers);
    rec.queries.lock().unwrap().push(params);
    Json(json!({
        "success": true,
        "data": {
            "data": [
                {"PI_02_ID": 1, "AKAN_NO": "A-001", "COUNTRY": "UAE", "GOP": "DHA",
                 "PATIENT_NAME": "Fatima", "DOB": "1980-02-14"},
                {"PI_02_ID": 2, "AKAN_NO": "A-002", "COUNTRY": "KSA", "GOP": "MOH",
                 "PATIENT_NAME": "Omar", "DOB": "1991-11-03"}
            ],
            "total": 2, "page": 1, "pageSize": 50, "totalPages": 1
        }
    }))
}

async fn search_failed() -> Json<Value> {
    Json(json!({"success": false, "error": "database unavailable"}))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: &str) -> ServletClient {
    ServletClient::new(ClientConfig::new(base_url).unwrap()).unwrap()
}

#[tokio::test]
async fn test_save_posts_rows_and_row_types() {
    let rec = Recorded::default();
    let base = spawn(
        Router::new()
            .route("/PI02ReactServlet", post(save_ok))
            .with_state(rec.clone()),
    )
    .await;

    let rows = vec![
        Row::new().with("PATIENT_NAME", "New patient"),
        Row::new().with("PI_02_ID", 7).with("GOP", "ZMH"),
    ];
    let mut changes = ChangeSet::new();
    changes.mark_insert(0);
    changes.mark_update(4);
    let batch = SaveBatch::new(rows.iter().collect(), changes);

    let outcome = client(&base).save_rows(&batch).await.unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.message.as_deref(), Some("2 row(s) saved"));

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(
        bodies[0],
        json!({
            "patients": [{"PATIENT_NAME": "New patient"}, {"PI_02_ID": 7, "GOP": "ZMH"}],
            "rowTypes": {"0": "insert", "4": "update"}
        })
    );
    assert_eq!(
        rec.content_types.lock().unwrap().as_slice(),
        &["application/json; charset=UTF-8".to_string()]
    );
    assert_eq!(rec.auth.lock().unwrap().as_slice(), &[None]);
}

#[tokio::test]
async fn test_bearer_token_is_sent_when_configured() {
    let rec = Recorded::default();
    let base = spawn(
        Router::new()
            .route("/api/patients", get(search_ok))
            .with_state(rec.clone()),
    )
    .await;

    let cfg = ClientConfig::new(&base)
        .unwrap()
        .with_bearer_token("token-123");
    let page = ServletClient::new(cfg)
        .unwrap()
        .search(&SearchQuery::new())
        .await
        .unwrap();

    assert_eq!(page.total, 2);
    assert_eq!(
        rec.auth.lock().unwrap().as_slice(),
        &[Some("Bearer token-123".to_string())]
    );
}

#[tokio::test]
async fn test_search_sends_non_blank_filters() {
    let rec = Recorded::default();
    let base = spawn(
        Router::new()
            .route("/api/patients", get(search_ok))
            .with_state(rec.clone()),
    )
    .await;

    let query = SearchQuery::new()
        .filter("patientName", "Fat")
        .filter("GOP", "  ")
        .filter("COUNTRY", "UAE");
    let page = client(&base).search(&query).await.unwrap();

    assert_eq!(page.data.len(), 2);
    assert_eq!(page.page_size, 50);
    assert_eq!(page.data[1].text("AKAN_NO").as_deref(), Some("A-002"));

    let queries = rec.queries.lock().unwrap();
    assert_eq!(queries[0].get("patientName").map(String::as_str), Some("Fat"));
    assert_eq!(queries[0].get("COUNTRY").map(String::as_str), Some("UAE"));
    assert!(!queries[0].contains_key("GOP"));
}

#[tokio::test]
async fn test_search_failure_envelope_is_an_api_error() {
    let base = spawn(Router::new().route("/api/patients", get(search_failed))).await;

    let err = client(&base)
        .search(&SearchQuery::new())
        .await
        .expect_err("envelope says success = false");
    assert!(matches!(err, ClientError::Api(ref reason) if reason == "database unavailable"));
}

#[tokio::test]
async fn test_status_classification() {
    let base = spawn(
        Router::new()
            .route("/unauthorised", post(|| async { StatusCode::UNAUTHORIZED }))
            .route("/forbidden", post(|| async { StatusCode::FORBIDDEN }))
            .route("/down", post(|| async { StatusCode::SERVICE_UNAVAILABLE }))
            .route("/teapot", post(|| async { StatusCode::IM_A_TEAPOT })),
    )
    .await;

    let rows = vec![Row::new().with("PI_02_ID", 1)];
    let mut changes = ChangeSet::new();
    changes.mark_delete(0);
    let batch = SaveBatch::new(rows.iter().collect(), changes);

    let save_to = |path: &str| {
        let cfg = ClientConfig::new(&base).unwrap().with_save_path(path);
        ServletClient::new(cfg).unwrap()
    };

    assert!(matches!(
        save_to("/unauthorised").save_rows(&batch).await,
        Err(ClientError::Unauthorized)
    ));
    assert!(matches!(
        save_to("/forbidden").save_rows(&batch).await,
        Err(ClientError::Forbidden)
    ));
    assert!(matches!(
        save_to("/down").save_rows(&batch).await,
        Err(ClientError::Server { status: 503 })
    ));
    assert!(matches!(
        save_to("/teapot").save_rows(&batch).await,
        Err(ClientError::UnexpectedStatus { status: 418 })
    ));
    match save_to("/missing").save_rows(&batch).await {
        Err(ClientError::NotFound(url)) => assert!(url.ends_with("/missing")),
        other => panic!("expected not found, got {other:?}"),
    }
}

#[tokio::test]
async fn test_grid_session_round_trip_through_servlet() {
    let rec = Recorded::default();
    let base = spawn(
        Router::new()
            .route("/api/patients", get(search_ok))
            .route("/PI02ReactServlet", post(save_ok))
            .with_state(rec.clone()),
    )
    .await;

    let mut grid = GridSession::new(
        client(&base),
        LogNotifier::new(true),
        SessionConfig::patient_registration().with_reload_after_save(false),
    );
    assert_eq!(grid.search(SearchQuery::new()).await.unwrap(), 2);

    grid.edit_row(1, |row| {
        row.set("GOP", "SEHA");
    })
    .unwrap();
    grid.mark(0, ChangeKind::Delete).unwrap();

    let report = grid.save().await.unwrap();
    assert!(matches!(
        report,
        SaveReport::Saved {
            updated: 1,
            deleted: 1,
            ..
        }
    ));
    assert_eq!(grid.rows().len(), 1);
    assert!(!grid.has_unsaved_changes());

    let bodies = rec.bodies.lock().unwrap();
    assert_eq!(bodies[0]["rowTypes"], json!({"0": "delete", "1": "update"}));
    assert_eq!(bodies[0]["patients"][1]["GOP"], json!("SEHA"));
}

#[tokio::test]
async fn test_rejected_save_keeps_grid_marks() {
    let rec = Recorded::default();
    let base = spawn(
        Router::new()
            .route("/api/patients", get(search_ok))
            .route("/PI02ReactServlet", post(save_rejected))
            .with_state(rec.clone()),
    )
    .await;

    let mut grid = GridSession::new(
        client(&base),
        LogNotifier::new(true),
        SessionConfig::patient_registration(),
    );
    grid.search(SearchQuery::new()).await.unwrap();
    grid.mark(1, ChangeKind::Update).unwrap();

    assert!(grid.save().await.is_err());
    assert_eq!(grid.tracker().changes().get(&1), Some(ChangeKind::Update));
    assert_eq!(rec.bodies.lock().unwrap().len(), 1);
}
