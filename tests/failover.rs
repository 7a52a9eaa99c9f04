//! Failover against real HTTP stubs: endpoints A and B answer 500, C rolls.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Router;
use axum::extract::Query;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use serde_json::json;
use tempfile::TempDir;

use bcdice_bot::config::Config;
use bcdice_bot::dice::providers::{self, ClientOptions};
use bcdice_bot::dice::{DiceClient, DiceError};
use bcdice_bot::dispatcher::Dispatcher;
use bcdice_bot::dispatcher::admin::AdminPassword;
use bcdice_bot::rules::RuleFileStore;

const PW: &str = "failover-pw";

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/")
}

/// Answers 500 to everything and counts hits.
async fn broken(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new().fallback(move || {
        let hits = Arc::clone(&hits);
        async move {
            hits.fetch_add(1, Ordering::SeqCst);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    });
    serve(app).await
}

/// A minimal BCDice-API: rolls echo the command, `Unknown` is unsupported.
async fn working(hits: Arc<AtomicUsize>) -> String {
    let app = Router::new()
        .route(
            "/v1/diceroll",
            get(move |Query(q): Query<HashMap<String, String>>| {
                let hits = Arc::clone(&hits);
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    let system = q.get("system").cloned().unwrap_or_default();
                    let command = q.get("command").cloned().unwrap_or_default();
                    if system == "Unknown" {
                        return (
                            StatusCode::BAD_REQUEST,
                            axum::Json(json!({ "ok": false, "reason": "unsupported dicebot" })),
                        )
                            .into_response();
                    }
                    let secret = command.starts_with('S');
                    axum::Json(json!({ "ok": true, "result": format!(": ({command}) > 7"), "secret": secret }))
                        .into_response()
                }
            }),
        )
        .route(
            "/v1/names",
            get(|| async { axum::Json(json!({ "names": [{ "system": "DiceBot" }, { "system": "Cthulhu" }] })) }),
        )
        .route(
            "/v1/systeminfo",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                match q.get("system").map(String::as_str) {
                    Some("Cthulhu") => axum::Json(json!({
                        "ok": true,
                        "systeminfo": {
                            "info": "Call of Cthulhu",
                            "prefixs": ["CC(B)?.*", "RES(B)?.*", "CBR(B)?\\(\\d+,\\d+\\)"]
                        }
                    })),
                    _ => axum::Json(json!({ "ok": false, "reason": "unsupported dicebot" })),
                }
            }),
        )
        .route("/rules/coin.txt", get(|| async { "#help flip a coin\nheads\ntails\n" }));
    serve(app).await
}

struct Cluster {
    a: String,
    b: String,
    c: String,
    hits_b: Arc<AtomicUsize>,
    hits_c: Arc<AtomicUsize>,
}

async fn cluster() -> Cluster {
    let hits_b = Arc::new(AtomicUsize::new(0));
    let hits_c = Arc::new(AtomicUsize::new(0));
    Cluster {
        a: broken(Arc::new(AtomicUsize::new(0))).await,
        b: broken(Arc::clone(&hits_b)).await,
        c: working(Arc::clone(&hits_c)).await,
        hits_b,
        hits_c,
    }
}

fn client(servers: &[&str]) -> DiceClient {
    let mut config = Config::test_default(std::path::Path::new("."));
    config.dice.servers = servers.iter().map(|s| (*s).to_string()).collect();
    config.dice.timeout_seconds = 5;
    providers::build(&config.dice, &config.keyword).unwrap()
}

async fn dispatcher(servers: &[&str]) -> (TempDir, Dispatcher) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::test_default(dir.path());
    config.dice.servers = servers.iter().map(|s| (*s).to_string()).collect();
    config.dice.timeout_seconds = 5;
    let client = providers::build(&config.dice, &config.keyword).unwrap();
    let rules = RuleFileStore::open(dir.path(), Duration::from_secs(5)).await.unwrap();
    (dir, Dispatcher::new(&config, client, rules, AdminPassword::new(PW)))
}

#[tokio::test]
async fn rotates_to_working_endpoint_and_sticks() {
    let cl = cluster().await;
    let dice = client(&[&cl.a, &cl.b, &cl.c]);

    let o = dice.roll("2d6", "DiceBot").await.unwrap();
    assert!(o.is_rolled());
    assert_eq!(o.to_string(), "DiceBot: (2d6) > 7");
    assert_eq!(dice.cursor(), 2);
    assert_eq!(cl.hits_c.load(Ordering::SeqCst), 1);

    // Later calls go straight to C.
    let before_b = cl.hits_b.load(Ordering::SeqCst);
    dice.roll("2d6", "DiceBot").await.unwrap();
    assert_eq!(cl.hits_b.load(Ordering::SeqCst), before_b);

    // Trusting B again costs one failed request, then C wins again.
    dice.set_endpoint(&cl.b).unwrap();
    assert_eq!(dice.cursor(), 1);
    assert!(dice.roll("2d6", "DiceBot").await.unwrap().is_rolled());
    assert_eq!(dice.cursor(), 2);
    assert_eq!(cl.hits_b.load(Ordering::SeqCst), before_b + 1);
}

#[tokio::test]
async fn all_endpoints_down_is_unavailable() {
    let cl = cluster().await;
    let dice = client(&[&cl.a, &cl.b]);
    let err = dice.roll("2d6", "DiceBot").await.unwrap_err();
    assert!(matches!(err, DiceError::Unavailable { attempts: 2 }));
}

#[tokio::test]
async fn unreachable_endpoint_fails_over() {
    let cl = cluster().await;
    // Port 9 (discard) on localhost is closed in test environments.
    let dice = client(&["http://127.0.0.1:9/", &cl.c]);
    assert!(dice.roll("1d100", "DiceBot").await.unwrap().is_rolled());
    assert_eq!(dice.cursor(), 1);
}

#[tokio::test]
async fn unsupported_system_is_an_answer_not_a_failure() {
    let cl = cluster().await;
    let dice = client(&[&cl.c, &cl.a]);
    let o = dice.roll("2d6", "Unknown").await.unwrap();
    assert!(o.is_error());
    assert!(!o.is_rolled());
    assert!(o.text().contains("Unknown"));
    assert_eq!(dice.cursor(), 0);
}

#[tokio::test]
async fn secret_results_are_masked() {
    let cl = cluster().await;
    let dice = client(&[&cl.c]);
    let o = dice.roll("S1d100", "DiceBot").await.unwrap();
    assert!(o.is_secret());
    assert_eq!(o.to_string(), "DiceBot: [Secret Dice]");
}

#[tokio::test]
async fn names_and_info() {
    let cl = cluster().await;
    let dice = client(&[&cl.a, &cl.c]);
    assert_eq!(dice.system_names().await.unwrap(), vec!["DiceBot", "Cthulhu"]);
    assert_eq!(dice.system_info("Cthulhu").await.unwrap().as_deref(), Some("Call of Cthulhu"));
    assert_eq!(dice.system_info("Hiyoko").await.unwrap(), None);
}

#[tokio::test]
async fn dispatcher_reports_outage_as_error_reply() {
    let cl = cluster().await;
    let (_dir, d) = dispatcher(&[&cl.a, &cl.b]).await;
    let replies = d.handle("2d6", "u", "ch").await.replies;
    assert_eq!(replies.len(), 1);
    assert!(replies[0].starts_with("[ERROR]"));
}

#[tokio::test]
async fn admin_server_and_register() {
    let cl = cluster().await;
    let (_dir, d) = dispatcher(&[&cl.a]).await;

    let replies = d.handle(&format!("bcdice admin {PW} server {}", cl.c), "u", "ch").await.replies;
    assert!(replies[0].contains(&format!("* {}", cl.c)));
    assert!(d.roll("2d6", "ch").await.unwrap().is_rolled());

    let url = format!("{}rules/coin.txt", cl.c);
    let replies = d.handle(&format!("bcdice admin {PW} register coin {url}"), "u", "ch").await.replies;
    assert_eq!(replies, vec!["Registered rule file [coin]"]);
    let o = d.roll("coin", "ch").await.unwrap();
    assert!(o.text().contains("heads") || o.text().contains("tails"));
}

#[tokio::test]
async fn backend_swap_keeps_running() {
    let cl = cluster().await;
    let (_dir, d) = dispatcher(&[&cl.a]).await;
    d.handle(&format!("bcdice admin {PW} backend {}", cl.c), "u", "ch").await;
    assert_eq!(d.client().endpoint_list().urls(), [cl.c.as_str()]);
    assert!(d.roll("2d6", "ch").await.unwrap().is_rolled());

    let options = ClientOptions { timeout: Duration::from_secs(1), keyword: "bcdice".into() };
    assert_eq!(providers::select_client("mock", &options).unwrap().kind(), "mock");
}

#[tokio::test]
async fn system_prefixes_come_from_systeminfo() {
    let cl = cluster().await;
    let dice = client(&[&cl.c]);
    assert_eq!(dice.system_prefixes("Cthulhu").await.unwrap().len(), 3);
    assert!(dice.system_prefixes("Hiyoko").await.unwrap().is_empty());

    let (_dir, d) = dispatcher(&[&cl.c]).await;
    assert!(!d.roll("CBR(30,50)", "ch").await.unwrap().is_rolled());
    d.handle("bcdice set Cthulhu", "u", "ch").await;
    assert!(d.roll("CBR(30,50)", "ch").await.unwrap().is_rolled());
    assert!(d.roll("RESB(10,5)", "ch").await.unwrap().is_rolled());
    assert!(!d.roll("hello", "ch").await.unwrap().is_rolled());
}
