//! Adapters against a local fake of the platform REST API

use mig_core::{
    ClientError, DeploymentClient, EnvironmentConfig, LineageClient, MigrationError, PolicyClient, ResourceClient,
};
use mig_http::{registry_for, Environment, HttpResourceClient, HttpTransport};
use mig_types::{DeploymentStatus, ImportDocument, LineageAction, LineageDirection, ResourceKey, ResourceKind};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use warp::http::StatusCode;
use warp::Filter;

type Bindings = Arc<Mutex<Vec<Value>>>;

fn reply(status: StatusCode, body: Value) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn no_content() -> warp::reply::WithStatus<&'static str> {
    warp::reply::with_status("", StatusCode::NO_CONTENT)
}

/// Start the fake platform and return its address
fn platform(bindings: Bindings) -> SocketAddr {
    let get_tool = warp::get()
        .and(warp::path!("api" / "agents" / "tools" / String))
        .and(warp::header::optional::<String>("authorization"))
        .map(|key: String, auth: Option<String>| {
            if key == "missing" {
                return reply(StatusCode::NOT_FOUND, json!({"error": "no such tool"}));
            }
            reply(StatusCode::OK, json!({"uuid": key, "toolName": key, "authorization": auth}))
        });

    let update_tool = warp::put()
        .and(warp::path!("api" / "agents" / "tools" / String))
        .and(warp::body::json())
        .map(|key: String, body: Value| reply(StatusCode::OK, json!({"data": {"uuid": key, "sent": body}})));

    let import_tool = warp::post()
        .and(warp::path!("api" / "agents" / "tools" / String / "import"))
        .map(|key: String| reply(StatusCode::CONFLICT, json!({"error": format!("{key} already exists")})));

    let delete_tool = warp::delete()
        .and(warp::path!("api" / "agents" / "tools" / String))
        .map(|_key: String| no_content());

    let import_custom_app = warp::post()
        .and(warp::path!("api" / "agents" / "apps" / "custom" / String / "import"))
        .and(warp::body::json())
        .map(|key: String, body: Value| {
            reply(
                StatusCode::CREATED,
                json!({"uuid": key, "route": "custom", "appType": body["appType"], "deploymentId": "d-9"}),
            )
        });

    let import_app = warp::post()
        .and(warp::path!("api" / "agents" / "apps" / String / "import"))
        .map(|key: String| reply(StatusCode::CREATED, json!({"uuid": key, "route": "standard"})));

    let lineage = warp::get()
        .and(warp::path!("api" / "lineage"))
        .and(warp::query::<HashMap<String, String>>())
        .map(|params: HashMap<String, String>| {
            let edges = if params.get("direction").map(String::as_str) == Some("upstream") {
                json!([{
                    "sourceKey": params["key"],
                    "sourceType": params["type"],
                    "targetKey": "search",
                    "targetType": "tool",
                    "action": params.get("action").cloned().unwrap_or_else(|| "USE".into()),
                    "depth": params["depth"].parse::<u32>().unwrap_or(0)
                }])
            } else {
                json!([])
            };
            reply(StatusCode::OK, edges)
        });

    let bind = warp::post()
        .and(warp::path!("api" / "policies" / "bindings"))
        .and(warp::body::json())
        .map(move |body: Value| {
            bindings.lock().unwrap().push(body);
            no_content()
        });

    let status = warp::get()
        .and(warp::path!("api" / "deployments" / String))
        .map(|id: String| {
            if id == "d-broken" {
                return reply(StatusCode::BAD_GATEWAY, json!({"error": "upstream down"}));
            }
            reply(StatusCode::OK, json!({"id": id, "status": "RUNNING"}))
        });

    let versions = warp::get()
        .and(warp::path!("api" / "agents" / "apps" / String / "deployments"))
        .map(|_app: String| {
            reply(
                StatusCode::OK,
                json!([
                    {"id": "d-1", "version": 1, "status": "STOPPED"},
                    {"id": "d-2", "version": 2, "status": "AVAILABLE"}
                ]),
            )
        });

    let delete_version = warp::delete()
        .and(warp::path!("api" / "agents" / "apps" / String / "deployments" / String))
        .map(|_app: String, id: String| {
            if id == "gone" {
                return warp::reply::with_status("", StatusCode::NOT_FOUND);
            }
            no_content()
        });

    let routes = get_tool
        .or(update_tool)
        .or(import_tool)
        .or(delete_tool)
        .or(import_custom_app)
        .or(import_app)
        .or(lineage)
        .or(bind)
        .or(status)
        .or(versions)
        .or(delete_version);

    let (addr, server) = warp::serve(routes).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn env_config(addr: SocketAddr) -> EnvironmentConfig {
    EnvironmentConfig {
        base_url: format!("http://{addr}/api"),
        token_env: None,
        timeout_secs: 5,
    }
}

fn connect() -> (Environment, EnvironmentConfig, Bindings) {
    let bindings = Bindings::default();
    let config = env_config(platform(bindings.clone()));
    (Environment::connect(&config).unwrap(), config, bindings)
}

fn app(app_type: &str) -> ImportDocument {
    ImportDocument::builder(ResourceKind::AgentApp)
        .field("name", "bot")
        .field("appType", app_type)
        .build()
}

#[tokio::test]
async fn get_sends_bearer_token() {
    std::env::set_var("MIG_HTTP_TEST_TOKEN", "s3cret");
    let bindings = Bindings::default();
    let config = EnvironmentConfig {
        token_env: Some("MIG_HTTP_TEST_TOKEN".into()),
        ..env_config(platform(bindings))
    };
    let tools = HttpResourceClient::new(ResourceKind::Tool, HttpTransport::new(&config).unwrap());

    let doc = tools.get(&ResourceKey::new("search")).await.unwrap();
    assert_eq!(doc["toolName"], json!("search"));
    assert_eq!(doc["authorization"], json!("Bearer s3cret"));
}

#[tokio::test]
async fn error_status_and_body_are_preserved() {
    let (env, _, _) = connect();
    let tools = env.registry();
    let tools = tools.client(ResourceKind::Tool).unwrap();

    let err = tools.get(&ResourceKey::new("missing")).await.unwrap_err();
    assert!(matches!(err, MigrationError::NotFound { kind: ResourceKind::Tool, .. }));

    let doc = ImportDocument::builder(ResourceKind::Tool).field("toolName", "t").build();
    let err = tools.import(&ResourceKey::new("t"), &doc).await.unwrap_err();
    assert!(err.is_conflict());
    assert!(err.to_string().contains("already exists"));
}

#[tokio::test]
async fn update_unwraps_data_envelope() {
    let (_, config, _) = connect();
    let tools = HttpResourceClient::new(ResourceKind::Tool, HttpTransport::new(&config).unwrap());
    let doc = ImportDocument::builder(ResourceKind::Tool).field("toolName", "t").build();

    let reply = tools.update(&ResourceKey::new("t"), &doc).await.unwrap();
    assert_eq!(reply["uuid"], json!("t"));
    assert_eq!(reply["sent"], json!({"toolName": "t"}));

    tools.delete(&ResourceKey::new("t")).await.unwrap();
}

#[tokio::test]
async fn custom_apps_import_through_custom_route() {
    let (_, config, _) = connect();
    let registry = registry_for(&config).unwrap();
    let apps = registry.client(ResourceKind::AgentApp).unwrap();
    let key = ResourceKey::new("bot");

    let custom = apps.import(&key, &app("custom")).await.unwrap();
    assert_eq!(custom["route"], json!("custom"));
    assert_eq!(custom["appType"], json!("custom"));
    assert_eq!(custom["deploymentId"], json!("d-9"));

    let standard = apps.import(&key, &app("standard")).await.unwrap();
    assert_eq!(standard["route"], json!("standard"));
}

#[tokio::test]
async fn lineage_query_passes_parameters() {
    let (env, _, _) = connect();
    let lineage = env.lineage();
    let key = ResourceKey::new("bot");

    let edges = lineage
        .query(&key, ResourceKind::AgentApp, LineageDirection::Upstream, Some(LineageAction::Create), 2)
        .await
        .unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].source_type, ResourceKind::AgentApp);
    assert_eq!(edges[0].target_key, ResourceKey::new("search"));
    assert_eq!(edges[0].action, LineageAction::Create);
    assert_eq!(edges[0].depth, 2);

    let none = lineage
        .query(&key, ResourceKind::AgentApp, LineageDirection::Downstream, None, 1)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn policy_binding_posts_path_and_project() {
    let (env, _, bindings) = connect();

    env.policy().bind("agents/tools/t1", 42).await.unwrap();
    assert_eq!(
        *bindings.lock().unwrap(),
        vec![json!({"resourcePath": "agents/tools/t1", "projectSeq": 42})]
    );
}

#[tokio::test]
async fn deployment_endpoints() {
    let (env, _, _) = connect();
    let deployments = env.deployments();
    let app = ResourceKey::new("bot");

    assert_eq!(deployments.status("d-2").await.unwrap(), DeploymentStatus::Available);
    assert_eq!(deployments.status("d-broken").await.unwrap_err().status, Some(502));

    let versions = deployments.list_versions(&app).await.unwrap();
    let ids: Vec<_> = versions.iter().map(|v| (v.id.as_str(), v.status)).collect();
    assert_eq!(ids, vec![("d-1", DeploymentStatus::Stopped), ("d-2", DeploymentStatus::Available)]);

    deployments.delete_version(&app, "d-1").await.unwrap();
    let err = deployments.delete_version(&app, "gone").await.unwrap_err();
    assert_eq!(err.status, Some(404));
}

#[tokio::test]
async fn unreachable_host_has_no_status() {
    let addr = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap();
    let tools = HttpResourceClient::new(ResourceKind::Tool, HttpTransport::new(&env_config(addr)).unwrap());

    let err: ClientError = tools.get(&ResourceKey::new("t")).await.unwrap_err();
    assert_eq!(err.status, None);
}
