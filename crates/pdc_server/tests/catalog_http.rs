//! HTTP-level tests for the catalog API.
//!
//! Drive the full router (JWT layer, pagination, error bodies) against the
//! in-memory store, so no database is needed.

use std::sync::Arc;

use axum::body::Body;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use jsonwebtoken::{encode, EncodingKey, Header};
use pdc_core::memory::MemoryStore;
use pdc_core::service::CatalogServiceImpl;
use pdc_server::middleware::jwt::{JwtConfig, CHANGE_COMMENT_HEADER};
use pdc_server::pagination::PageConfig;
use pdc_server::router::build_router;
use serde::Serialize;
use serde_json::{json, Value};
use tower::ServiceExt;

// ── Test JWT helpers ───────────────────────────────────────────

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

#[derive(Debug, Serialize)]
struct TestClaims {
    sub: String,
}

fn make_jwt(actor_id: &str) -> String {
    encode(
        &Header::default(),
        &TestClaims {
            sub: actor_id.into(),
        },
        &EncodingKey::from_secret(TEST_JWT_SECRET),
    )
    .expect("failed to encode test JWT")
}

// ── Test app ───────────────────────────────────────────────────

struct TestApp {
    router: axum::Router,
    token: String,
}

impl TestApp {
    fn new() -> Self {
        Self::with_pages(PageConfig::default())
    }

    fn with_pages(pages: PageConfig) -> Self {
        let service = Arc::new(CatalogServiceImpl::new(Arc::new(MemoryStore::new())));
        Self {
            router: build_router(
                service,
                JwtConfig::from_secret(TEST_JWT_SECRET),
                pages,
            ),
            token: make_jwt("alice"),
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, raw) = self.send_raw(request).await;
        let body = if raw.is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&raw).unwrap()
        };
        (status, body)
    }

    /// Response body as sent, for checks on key order.
    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, String) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    async fn get_raw(&self, path: &str) -> String {
        let request = Request::builder()
            .uri(format!("/rest_api/v1{path}"))
            .body(Body::empty())
            .unwrap();
        let (status, raw) = self.send_raw(request).await;
        assert_eq!(status, StatusCode::OK);
        raw
    }

    async fn get(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(format!("/rest_api/v1{path}"))
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn write(&self, method: &str, path: &str, body: Value) -> (StatusCode, Value) {
        self.write_with(method, path, body, None).await
    }

    async fn write_with(
        &self,
        method: &str,
        path: &str,
        body: Value,
        comment: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/rest_api/v1{path}"))
            .header("authorization", format!("Bearer {}", self.token))
            .header("content-type", "application/json");
        if let Some(comment) = comment {
            builder = builder.header(CHANGE_COMMENT_HEADER, comment);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// release-1.0 and release-1.1, each with Server and Client on x86_64.
    async fn seeded() -> Self {
        let app = Self::new();
        for version in ["1.0", "1.1"] {
            let (status, _) = app
                .write(
                    "POST",
                    "/releases/",
                    json!({ "short": "release", "version": version, "name": "Test Release" }),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED);
            let variants: Vec<Value> = ["Server", "Client"]
                .iter()
                .map(|uid| {
                    json!({
                        "release": format!("release-{version}"), "id": uid, "uid": uid,
                        "name": uid, "type": "variant", "arches": ["x86_64"]
                    })
                })
                .collect();
            let (status, _) = app.write("POST", "/variants/", json!(variants)).await;
            assert_eq!(status, StatusCode::CREATED);
        }
        app
    }
}

fn repo_body(variant_uid: &str, name: &str) -> Value {
    json!({
        "release_id": "release-1.0", "variant_uid": variant_uid, "arch": "x86_64",
        "service": "rhn", "repo_family": "dist", "content_format": "rpm",
        "content_category": "binary", "name": name, "product_id": 22
    })
}

// ── Auth ───────────────────────────────────────────────────────

#[tokio::test]
async fn write_without_token_is_401() {
    let app = TestApp::seeded().await;
    let request = Request::builder()
        .method("POST")
        .uri("/rest_api/v1/repos/")
        .header("content-type", "application/json")
        .body(Body::from(repo_body("Server", "repo-1").to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        body,
        json!({ "detail": "Authentication credentials were not provided." })
    );
}

#[tokio::test]
async fn forged_token_is_401() {
    let app = TestApp::seeded().await;
    let forged = encode(
        &Header::default(),
        &TestClaims { sub: "mallory".into() },
        &EncodingKey::from_secret(b"wrong-secret"),
    )
    .unwrap();
    let request = Request::builder()
        .method("DELETE")
        .uri("/rest_api/v1/repos/1/")
        .header("authorization", format!("Bearer {forged}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["detail"].as_str().unwrap().starts_with("Invalid token"));
}

#[tokio::test]
async fn reads_are_anonymous() {
    let app = TestApp::new();
    let (status, body) = app.get("/arches/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(12));
}

#[tokio::test]
async fn health_is_outside_the_api_prefix() {
    let app = TestApp::new();
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn unknown_paths_get_not_found_body() {
    let app = TestApp::new();
    let (status, body) = app.get("/nothing/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));

    let request = Request::builder().uri("/nope").body(Body::empty()).unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));

    // No route means no auth check either.
    let request = Request::builder()
        .method("POST")
        .uri("/rest_api/v1/nothing/")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));
}

// ── Lookups ────────────────────────────────────────────────────

#[tokio::test]
async fn repo_families_list_and_filter() {
    let app = TestApp::new();
    let (status, body) = app.get("/repo-families/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(3));

    let (_, body) = app.get("/repo-families/?name=di").await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["name"], json!("dist"));
}

#[tokio::test]
async fn lookups_reject_unknown_params() {
    let app = TestApp::new();
    let (status, body) = app.get("/services/?foo=bar").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Unknown query params: foo." }));
}

// ── Releases ───────────────────────────────────────────────────

#[tokio::test]
async fn bulk_create_releases() {
    let app = TestApp::new();
    let (status, body) = app
        .write(
            "POST",
            "/releases/",
            json!([
                { "short": "product", "version": "1.0", "name": "Product" },
                {
                    "short": "product", "version": "2.0", "name": "Product",
                    "release_type": "updates"
                },
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["release_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["product-1.0", "product-2.0-updates"]);

    let (status, body) = app
        .write(
            "POST",
            "/releases/",
            json!([
                { "short": "product", "version": "3.0", "name": "Product" },
                { "short": "product", "version": "1.0", "name": "Product" },
            ]),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["invalid_data_id"], json!(1));
    assert_eq!(
        body["detail"],
        json!({ "non_field_errors": ["Release with this Release id already exists."] })
    );

    let (_, list) = app.get("/releases/").await;
    assert_eq!(list["count"], json!(2));
}

#[tokio::test]
async fn put_release_rederives_release_id() {
    let app = TestApp::seeded().await;
    let (status, body) = app
        .write(
            "PUT",
            "/releases/release-1.0/",
            json!({
                "short": "release", "version": "1.0", "name": "Renamed",
                "release_type": "updates", "base_product": "rhel-7",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["release_id"], json!("release-1.0-updates@rhel-7"));
    assert_eq!(body["name"], json!("Renamed"));
    assert_eq!(body["active"], json!(true));

    let (status, _) = app.get("/releases/release-1.0/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, fetched) = app.get("/releases/release-1.0-updates@rhel-7/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, body);

    // Variants follow the release through the join.
    let (_, variants) = app.get("/variants/?release=release-1.0-updates@rhel-7").await;
    assert_eq!(variants["count"], json!(2));

    let (status, body) = app
        .write("PUT", "/releases/release-1.1/", json!({ "name": "Only a name" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["short"][0], json!("This field is required."));
}

#[tokio::test]
async fn release_list_filters() {
    let app = TestApp::seeded().await;
    let (status, _) = app
        .write(
            "POST",
            "/releases/",
            json!({
                "short": "release", "version": "2.0", "name": "Test Release",
                "release_type": "updates", "base_product": "rhel-7", "active": false,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get("/releases/?active=false").await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["release_id"], json!("release-2.0-updates@rhel-7"));

    let (_, body) = app.get("/releases/?active=true").await;
    assert_eq!(body["count"], json!(2));

    let (_, body) = app.get("/releases/?base_product=rhel-7").await;
    assert_eq!(body["count"], json!(1));

    let (_, body) = app.get("/releases/?release_type=updates").await;
    assert_eq!(body["count"], json!(1));

    let (_, body) = app.get("/releases/?release_type=ga&release_type=updates").await;
    assert_eq!(body["count"], json!(3));

    let (status, _) = app.get("/releases/?active=maybe").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn release_short_and_version_format_errors() {
    let app = TestApp::new();
    let (status, body) = app
        .write(
            "POST",
            "/releases/",
            json!({ "short": "Foo", "version": "x.1", "name": "Bad" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "short": ["Only lowercase letters and '-' are allowed."],
            "version": ["Only numbers separated by '.' are allowed."],
        })
    );

    let (_, list) = app.get("/releases/").await;
    assert_eq!(list["count"], json!(0));
}

// ── Repos ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_fetch_repo() {
    let app = TestApp::seeded().await;
    let (status, created) = app
        .write("POST", "/repos/", repo_body("Server", "repo-1"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["shadow"], json!(false));
    assert_eq!(created["product_id"], json!(22));

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = app.get(&format!("/repos/{id}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn duplicate_repo_is_400() {
    let app = TestApp::seeded().await;
    app.write("POST", "/repos/", repo_body("Server", "repo-1")).await;
    let (status, body) = app
        .write("POST", "/repos/", repo_body("Server", "repo-1"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn repo_without_variant_arch_is_400() {
    let app = TestApp::seeded().await;
    let mut body = repo_body("Server", "repo-1");
    body["arch"] = json!("ppc64");
    let (status, body) = app.write("POST", "/repos/", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "non_field_errors":
                ["No VariantArch for release_id=release-1.0, variant_uid=Server, arch=ppc64"]
        })
    );

    let (status, body) = app
        .write("POST", "/repos/", repo_body("Workstation", "repo-1"))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["non_field_errors"][0],
        json!("No VariantArch for release_id=release-1.0, variant_uid=Workstation, arch=x86_64")
    );
}

#[tokio::test]
async fn unknown_fields_are_rejected() {
    let app = TestApp::seeded().await;
    let mut body = repo_body("Server", "repo-1");
    body["foo"] = json!("bar");
    let (status, body) = app.write("POST", "/repos/", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Unknown fields: \"foo\"." }));
}

#[tokio::test]
async fn bulk_create_is_atomic() {
    let app = TestApp::seeded().await;
    let mut bad = repo_body("Client", "repo-2");
    bad["content_format"] = json!("foo");
    let (status, body) = app
        .write("POST", "/repos/", json!([repo_body("Server", "repo-1"), bad]))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["invalid_data_id"], json!(1));
    assert_eq!(body["invalid_data"]["content_format"], json!("foo"));
    assert_eq!(
        body["detail"]["content_format"][0],
        json!("'foo' is not allowed value. Use one of 'rpm', 'iso', 'kickstart', 'comps'.")
    );

    let (_, list) = app.get("/repos/").await;
    assert_eq!(list["count"], json!(0));
}

#[tokio::test]
async fn debug_repo_name_rule() {
    let app = TestApp::seeded().await;
    let mut body = repo_body("Server", "repo-1");
    body["content_category"] = json!("debug");
    let (status, body) = app.write("POST", "/repos/", body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "non_field_errors": ["Missing 'debug' in repo name 'repo-1'"] })
    );
}

#[tokio::test]
async fn put_without_product_id_keeps_stored_value() {
    let app = TestApp::seeded().await;
    let (_, created) = app
        .write("POST", "/repos/", repo_body("Server", "repo-1"))
        .await;
    let id = created["id"].as_i64().unwrap();

    let mut body = repo_body("Server", "renamed");
    body.as_object_mut().unwrap().remove("product_id");
    let (status, updated) = app.write("PUT", &format!("/repos/{id}/"), body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], json!("renamed"));
    assert_eq!(updated["product_id"], json!(22));
}

#[tokio::test]
async fn patch_repo_shadow() {
    let app = TestApp::seeded().await;
    let (_, created) = app
        .write("POST", "/repos/", repo_body("Server", "repo-1"))
        .await;
    let id = created["id"].as_i64().unwrap();
    let (status, patched) = app
        .write("PATCH", &format!("/repos/{id}/"), json!({ "shadow": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["shadow"], json!(true));
    assert_eq!(patched["name"], json!("repo-1"));
}

#[tokio::test]
async fn repo_filters() {
    let app = TestApp::seeded().await;
    app.write("POST", "/repos/", repo_body("Server", "repo-1")).await;
    let mut client = repo_body("Client", "repo-2");
    client["service"] = json!("pulp");
    app.write("POST", "/repos/", client).await;

    let (_, body) = app.get("/repos/?service=pulp").await;
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["results"][0]["variant_uid"], json!("Client"));

    let (_, body) = app.get("/repos/?variant_uid=Server&variant_uid=Client").await;
    assert_eq!(body["count"], json!(2));

    let (_, body) = app.get("/repos/?shadow=true").await;
    assert_eq!(body["count"], json!(0));

    let (status, _) = app.get("/repos/?product_id=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.get("/repos/?colour=red").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "detail": "Unknown query params: colour." }));
}

#[tokio::test]
async fn delete_repo_then_404() {
    let app = TestApp::seeded().await;
    let (_, created) = app
        .write("POST", "/repos/", repo_body("Server", "repo-1"))
        .await;
    let path = format!("/repos/{}/", created["id"]);

    let (status, body) = app.write("DELETE", &path, Value::Null).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, body) = app.write("DELETE", &path, Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));

    let (status, _) = app.get("/repos/abc/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_delete_unknown_id_is_atomic() {
    let app = TestApp::seeded().await;
    let (_, created) = app
        .write("POST", "/repos/", repo_body("Server", "repo-1"))
        .await;
    let (status, body) = app
        .write("DELETE", "/repos/", json!([created["id"], 9999]))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["invalid_data_id"], json!(1));

    let (_, list) = app.get("/repos/").await;
    assert_eq!(list["count"], json!(1));
}

// ── Clone ──────────────────────────────────────────────────────

#[tokio::test]
async fn clone_repos_between_releases() {
    let app = TestApp::seeded().await;
    app.write("POST", "/repos/", repo_body("Server", "repo-1")).await;
    let mut debug = repo_body("Client", "repo-debug");
    debug["content_category"] = json!("debug");
    app.write("POST", "/repos/", debug).await;

    let (status, body) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({
                "release_id_from": "release-1.0",
                "release_id_to": "release-1.1",
                "include_content_category": ["debug"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let cloned = body.as_array().unwrap();
    assert_eq!(cloned.len(), 1);
    assert_eq!(cloned[0]["release_id"], json!("release-1.1"));
    assert_eq!(cloned[0]["name"], json!("repo-debug"));

    let (_, list) = app.get("/repos/?release_id=release-1.1").await;
    assert_eq!(list["count"], json!(1));
}

#[tokio::test]
async fn clone_filters_on_shadow_and_product_id() {
    let app = TestApp::seeded().await;
    app.write("POST", "/repos/", repo_body("Server", "repo-1")).await;
    let mut shadow = repo_body("Server", "repo-shadow");
    shadow["shadow"] = json!(true);
    app.write("POST", "/repos/", shadow).await;
    let mut other_product = repo_body("Client", "repo-client");
    other_product["product_id"] = json!(33);
    app.write("POST", "/repos/", other_product).await;

    let (status, body) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({
                "release_id_from": "release-1.0",
                "release_id_to": "release-1.1",
                "include_shadow": true,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["repo-shadow"]);

    let (status, body) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({
                "release_id_from": "release-1.0",
                "release_id_to": "release-1.1",
                "include_shadow": "false",
                "include_product_id": 33,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let cloned = body.as_array().unwrap();
    assert_eq!(cloned.len(), 1);
    assert_eq!(cloned[0]["name"], json!("repo-client"));
    assert_eq!(cloned[0]["product_id"], json!(33));

    let (status, body) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({
                "release_id_from": "release-1.0",
                "release_id_to": "release-1.1",
                "include_shadow": "sometimes",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "detail": "include_shadow: \"sometimes\" is not a boolean" })
    );

    let (_, list) = app.get("/repos/?release_id=release-1.1").await;
    assert_eq!(list["count"], json!(2));
}

#[tokio::test]
async fn clone_argument_errors() {
    let app = TestApp::seeded().await;

    let (status, body) = app
        .write("POST", "/rpc/repos/clone/", json!({ "release_id_to": "release-1.1" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["release_id_from"][0], json!("This field is required."));

    let (status, _) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({ "release_id_from": "release-1.0", "release_id_to": "release-1.1", "foo": 1 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({
                "release_id_from": "release-1.0",
                "release_id_to": "release-1.1",
                "include_service": "rhn",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("is not a list"));

    let (status, _) = app
        .write(
            "POST",
            "/rpc/repos/clone/",
            json!({ "release_id_from": "nope", "release_id_to": "release-1.1" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ── Variants ───────────────────────────────────────────────────

#[tokio::test]
async fn variant_arch_patch() {
    let app = TestApp::seeded().await;
    let (status, body) = app
        .write(
            "PATCH",
            "/variants/release-1.0/Server/",
            json!({ "add_arches": ["ppc64"] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arches"], json!(["ppc64", "x86_64"]));

    let (status, body) = app
        .write(
            "PATCH",
            "/variants/release-1.0/Server/",
            json!({ "remove_arches": ["ia64"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["remove_arches"].is_array());

    let (status, body) = app
        .write(
            "PATCH",
            "/variants/release-1.0/Server/",
            json!({ "arches": ["x86_64"], "add_arches": ["ppc64"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["non_field_errors"].is_array());
}

#[tokio::test]
async fn variant_bulk_create_is_atomic() {
    let app = TestApp::seeded().await;
    let good = json!({
        "release": "release-1.0", "id": "Workstation", "uid": "Workstation",
        "name": "Workstation", "type": "variant", "arches": ["x86_64"]
    });
    let bad = json!({
        "release": "release-1.0", "id": "Compute", "uid": "Compute",
        "name": "Compute", "type": "variant", "arches": ["sparc"]
    });
    let (status, body) = app.write("POST", "/variants/", json!([good, bad])).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["invalid_data_id"], json!(1));
    assert_eq!(body["invalid_data"]["uid"], json!("Compute"));
    assert_eq!(body["detail"], json!({ "arches": ["Arch 'sparc' does not exist."] }));

    let (_, list) = app.get("/variants/?release=release-1.0").await;
    assert_eq!(list["count"], json!(2));
    let (status, _) = app.get("/variants/release-1.0/Workstation/").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn variant_put_replaces_arches() {
    let app = TestApp::seeded().await;
    let (status, body) = app
        .write(
            "PUT",
            "/variants/release-1.0/Server/",
            json!({
                "release": "release-1.0", "id": "Server", "uid": "Server",
                "name": "Server", "type": "variant", "arches": ["s390x", "ppc64"]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["arches"], json!(["ppc64", "s390x"]));

    let (_, fetched) = app.get("/variants/release-1.0/Server/").await;
    assert_eq!(fetched["arches"], json!(["ppc64", "s390x"]));

    let (_, on_x86) = app.get("/variants/?arch=x86_64&release=release-1.0").await;
    assert_eq!(on_x86["count"], json!(1));
    assert_eq!(on_x86["results"][0]["uid"], json!("Client"));
}

#[tokio::test]
async fn responses_keep_declared_key_order() {
    let app = TestApp::seeded().await;
    let raw = app.get_raw("/variants/release-1.0/Server/").await;
    let variant = concat!(
        r#"{"release":"release-1.0","id":"Server","uid":"Server","#,
        r#""name":"Server","type":"variant","arches":["x86_64"]}"#,
    );
    assert_eq!(raw, variant);

    app.write("POST", "/repos/", repo_body("Server", "repo-1")).await;
    let raw = app.get_raw("/repos/?page_size=-1").await;
    let repo_head = r#"[{"id":1,"release_id":"release-1.0","variant_uid":"Server","arch":"x86_64""#;
    assert!(raw.starts_with(repo_head), "{raw}");

    let raw = app.get_raw("/releases/").await;
    let envelope_head =
        r#"{"count":2,"next":null,"previous":null,"results":[{"release_id":"release-1.0","short""#;
    assert!(raw.starts_with(envelope_head), "{raw}");
}

#[tokio::test]
async fn variant_with_repos_is_protected() {
    let app = TestApp::seeded().await;
    app.write("POST", "/repos/", repo_body("Server", "repo-1")).await;

    let (status, _) = app
        .write(
            "PATCH",
            "/variants/release-1.0/Server/",
            json!({ "remove_arches": ["x86_64"] }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .write("DELETE", "/variants/release-1.0/Server/", Value::Null)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .write("DELETE", "/variants/", json!(["release-1.0/Client"]))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, body) = app.get("/variants/?release=release-1.0").await;
    assert_eq!(body["count"], json!(1));
}

// ── Changesets ─────────────────────────────────────────────────

#[tokio::test]
async fn writes_are_audited_with_comment() {
    let app = TestApp::seeded().await;
    let (_, before) = app.get("/changesets/").await;
    let before = before["count"].as_i64().unwrap();

    app.write_with(
        "POST",
        "/repos/",
        repo_body("Server", "repo-1"),
        Some("adding repo"),
    )
    .await;

    let (_, body) = app.get("/changesets/").await;
    assert_eq!(body["count"], json!(before + 1));
    let latest = &body["results"][0];
    assert_eq!(latest["author"], json!("alice"));
    assert_eq!(latest["comment"], json!("adding repo"));
    assert_eq!(latest["changes"][0]["resource"], json!("repo"));
    assert_eq!(latest["changes"][0]["old_value"], json!("null"));

    let (_, filtered) = app.get("/changesets/?resource=repo").await;
    assert_eq!(filtered["count"], json!(1));

    let id = latest["id"].as_i64().unwrap();
    let (status, single) = app.get(&format!("/changesets/{id}/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&single, latest);
}

#[tokio::test]
async fn failed_write_leaves_no_changeset() {
    let app = TestApp::seeded().await;
    let (_, before) = app.get("/changesets/").await;
    let (status, _) = app
        .write("POST", "/repos/", json!({ "name": "incomplete" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, after) = app.get("/changesets/").await;
    assert_eq!(after["count"], before["count"]);
}

#[tokio::test]
async fn changeset_author_and_until_filters() {
    let app = TestApp::seeded().await;
    let (_, body) = app.get("/changesets/?author=alice").await;
    assert_eq!(body["count"], json!(4));

    let (_, body) = app.get("/changesets/?author=bob").await;
    assert_eq!(body["count"], json!(0));

    let (_, body) = app.get("/changesets/?changed_until=2000-01-01").await;
    assert_eq!(body["count"], json!(0));

    let (_, body) = app
        .get("/changesets/?changed_until=2100-01-01&author=bob&author=alice")
        .await;
    assert_eq!(body["count"], json!(4));
}

#[tokio::test]
async fn changeset_date_filter_rejects_garbage() {
    let app = TestApp::seeded().await;
    let (status, body) = app.get("/changesets/?changed_since=yesterday").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_array());

    let (status, body) = app.get("/changesets/?changed_since=2000-01-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(4));
}

// ── Pagination ─────────────────────────────────────────────────

#[tokio::test]
async fn pagination_links_and_bounds() {
    let app = TestApp::with_pages(PageConfig {
        page_size: 5,
        ..PageConfig::default()
    });

    let (_, first) = app.get("/arches/").await;
    assert_eq!(first["count"], json!(12));
    assert_eq!(first["results"].as_array().unwrap().len(), 5);
    assert_eq!(first["previous"], Value::Null);
    assert_eq!(first["next"], json!("/rest_api/v1/arches/?page=2"));

    let (_, last) = app.get("/arches/?page=3").await;
    assert_eq!(last["results"].as_array().unwrap().len(), 2);
    assert_eq!(last["next"], Value::Null);
    assert_eq!(last["previous"], json!("/rest_api/v1/arches/?page=2"));

    let (status, body) = app.get("/arches/?page=4").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Invalid page." }));

    let (_, all) = app.get("/arches/?page_size=-1").await;
    assert_eq!(all.as_array().unwrap().len(), 12);
}
