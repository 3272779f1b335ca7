use evedex::{Filter, Session, SessionConfig, builtin};
use evedex_remote::ApiConfig;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, route: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn static_data_api() -> MockServer {
    let server = MockServer::start().await;
    serve(&server, "/api/TypeNames", json!([
        {"typeId": 587, "typeName": "Rifter"},
        {"typeId": 24698, "typeName": "Drake"}
    ]))
    .await;
    serve(&server, "/api/Blueprints", json!([
        {"productId": 587, "blueprintId": 691, "blueprintName": "Rifter Blueprint", "productName": "Rifter"}
    ]))
    .await;
    serve(&server, "/api/InvCategories", json!([{"categoryId": 6, "categoryName": "Ship"}])).await;
    serve(&server, "/api/InvGroups", json!([{"groupId": 25, "groupName": "Frigate"}])).await;
    serve(&server, "/api/InvTypes", json!([
        {"typeId": 587, "typeName": "Rifter", "marketGroupId": 64},
        {"typeId": 24698, "typeName": "Drake", "marketGroupId": 471}
    ]))
    .await;
    serve(&server, "/api/MarketGroups/tree", json!([
        {"marketGroupId": 4, "marketGroupName": "Ships", "children": [
            {"marketGroupId": 64, "marketGroupName": "Minmatar", "children": null},
            {"marketGroupId": 471, "marketGroupName": "Caldari"}
        ]}
    ]))
    .await;
    server
}

// ── Init over HTTP ───────────────────────────────────────────────

#[tokio::test]
async fn init_against_http_api() {
    let server = static_data_api().await;
    let config = SessionConfig {
        api: ApiConfig::with_base_url(server.uri()),
        ..SessionConfig::default()
    };

    let session = Session::init(config).await.unwrap();

    assert!(session.seed_report().unwrap().is_complete());
    assert_eq!(session.groups().find_all_descendant_ids(4), vec![64, 471]);
    let drakes = session
        .query_default(builtin::TYPE_NAMES, &[Filter::equals("typeName", "drake")])
        .unwrap();
    assert_eq!(drakes.len(), 1);

    let staged = session.staged_items(&[4], Some("ake"), true).unwrap();
    assert_eq!(staged.len(), 1);
    assert_eq!(staged[0].text("typeName"), Some("Drake"));
    session.dispose();
}

#[tokio::test]
async fn init_with_api_down_still_opens() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    let config = SessionConfig {
        api: ApiConfig::with_base_url(server.uri()),
        ..SessionConfig::default()
    };

    let session = Session::init(config).await.unwrap();

    assert_eq!(session.seed_report().unwrap().failed.len(), 5);
    assert!(!session.groups().is_loaded());
    assert!(session.query_default(builtin::INV_TYPES, &[]).unwrap().is_empty());
}

#[tokio::test]
async fn init_with_on_disk_store() {
    let server = static_data_api().await;
    let dir = tempfile::tempdir().unwrap();
    let config = SessionConfig {
        api: ApiConfig::with_base_url(server.uri()),
        store_path: Some(dir.path().join("dex.db")),
        ..SessionConfig::default()
    };

    Session::init(config.clone()).await.unwrap().dispose();
    let session = Session::init(config).await.unwrap();

    assert_eq!(session.seed_report().unwrap().skipped.len(), 5);
    assert_eq!(session.store().count(builtin::TYPE_NAMES).unwrap(), 2);
}
