use super::*;
use crate::{
    compose::PlatformEnvironment,
    core::{Application, Environment, MemoryStore, Tenant},
    k8s::cluster::fake::FakeCluster,
};
use bytes::Bytes;
use http_body_util::Full;
use pretty_assertions::assert_eq;
use serde_json::json;
use tower::Service;

const TENANT_ID: &str = "4acf7a6e-6b1c-4a0d-9c8f-1f0b0e6e7a3d";
const APPLICATION_ID: &str = "cc142a0d-deac-4974-ada9-de6e21337dca";
const MICROSERVICE_ID: &str = "c974e5a2-3f7c-4b25-a1b2-6d38b7c2a9a1";

fn api() -> (Api<FakeCluster, MemoryStore>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::with_application(Application {
        id: APPLICATION_ID.to_string(),
        name: "AlejandroRiley".to_string(),
        tenant: Tenant {
            id: TENANT_ID.to_string(),
            name: "JeanetteJohnston".to_string(),
        },
        environments: vec![Environment {
            name: "Dev".to_string(),
            ..Default::default()
        }],
    }));
    let dispatcher = Dispatcher::new(
        store.clone(),
        FakeCluster::default(),
        PlatformEnvironment::Dev,
    );
    (Api::new(dispatcher), store)
}

fn create_body() -> Full<Bytes> {
    let doc = json!({
        "dolittle": {
            "tenantId": TENANT_ID,
            "applicationId": APPLICATION_ID,
            "microserviceId": MICROSERVICE_ID,
        },
        "name": "Orders",
        "kind": "simple",
        "environment": "Dev",
        "extra": {
            "headImage": "dolittle/spinner:0.0.0",
            "runtimeImage": "dolittle/runtime:5.6.0",
        },
    });
    Full::new(Bytes::from(serde_json::to_vec(&doc).unwrap()))
}

fn delete_uri() -> String {
    format!(
        "/application/{}/environment/Dev/microservice/{}",
        APPLICATION_ID, MICROSERVICE_ID
    )
}

async fn send(
    api: &mut Api<FakeCluster, MemoryStore>,
    req: Request<Full<Bytes>>,
) -> (http::StatusCode, serde_json::Value) {
    let rsp = api.call(req).await.expect("request must be served");
    let status = rsp.status();
    let bytes = rsp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response must be json")
    };
    (status, body)
}

#[tokio::test]
async fn creates_and_deletes_microservices() {
    let (mut api, store) = api();

    let req = Request::post("/microservice")
        .header(TENANT_ID_HEADER, TENANT_ID)
        .body(create_body())
        .unwrap();
    let (status, body) = send(&mut api, req).await;
    assert_eq!(status, http::StatusCode::OK);
    assert_eq!(body["name"], json!("Orders"));
    assert_eq!(body["kind"], json!("simple"));
    assert_eq!(store.writes(), 1);

    let req = Request::delete(delete_uri())
        .header(TENANT_ID_HEADER, TENANT_ID)
        .body(Full::default())
        .unwrap();
    let (status, _) = send(&mut api, req).await;
    assert_eq!(status, http::StatusCode::OK);
    assert!(store
        .get_microservices(TENANT_ID, APPLICATION_ID)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn requires_tenant_header() {
    let (mut api, store) = api();

    let req = Request::post("/microservice")
        .body(create_body())
        .unwrap();
    let (status, body) = send(&mut api, req).await;
    assert_eq!(status, http::StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "message": "missing Tenant-ID header" }));
    assert_eq!(store.writes(), 0);
}

#[tokio::test]
async fn dispatcher_errors_carry_status_and_message() {
    let (mut api, _) = api();

    let req = Request::post("/microservice")
        .header(TENANT_ID_HEADER, "00000000-0000-0000-0000-000000000000")
        .body(create_body())
        .unwrap();
    let (status, body) = send(&mut api, req).await;
    assert_eq!(status, http::StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().starts_with("forbidden:"));

    let req = Request::delete(delete_uri())
        .header(TENANT_ID_HEADER, TENANT_ID)
        .body(Full::default())
        .unwrap();
    let (status, _) = send(&mut api, req).await;
    assert_eq!(status, http::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (mut api, _) = api();

    for (method, uri) in [
        (http::Method::GET, "/microservice"),
        (http::Method::POST, "/"),
        (http::Method::DELETE, "/application/a/environment/Dev"),
        (http::Method::POST, delete_uri().as_str()),
    ] {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(TENANT_ID_HEADER, TENANT_ID)
            .body(Full::default())
            .unwrap();
        let (status, body) = send(&mut api, req).await;
        assert_eq!(status, http::StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, serde_json::Value::Null);
    }
}

#[test]
fn parses_routes() {
    assert_eq!(
        Route::parse(&http::Method::POST, "/microservice/"),
        Some(Route::Create)
    );
    assert_eq!(
        Route::parse(
            &http::Method::DELETE,
            "/application/app/environment/Dev/microservice/ms"
        ),
        Some(Route::Delete {
            application_id: "app".to_string(),
            environment: "Dev".to_string(),
            microservice_id: "ms".to_string(),
        })
    );
    assert_eq!(
        Route::parse(
            &http::Method::DELETE,
            "/application//environment/Dev/microservice/ms"
        ),
        None
    );
}
