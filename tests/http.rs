use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("scorecard_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/week")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_trading_scorecard"))
        .env("PORT", port.to_string())
        .env("APP_DATA_PATH", data_path)
        .env("GIST_API_URL", "http://127.0.0.1:9")
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

/// Every test starts from an empty scorecard on the shared server.
async fn fresh(server: &TestServer, client: &Client) {
    let response = client
        .post(format!("{}/api/reset-all", server.base_url))
        .json(&json!({ "confirm": true }))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

async fn send(request: reqwest::RequestBuilder) -> (StatusCode, Value) {
    let response = request.send().await.unwrap();
    let status = response.status();
    let text = response.text().await.unwrap();
    (status, serde_json::from_str(&text).unwrap_or(Value::String(text)))
}

async fn toggle(server: &TestServer, client: &Client, day: usize, category: usize) -> Value {
    let (status, body) = send(
        client
            .post(format!("{}/api/week/toggle", server.base_url))
            .json(&json!({ "day": day, "category": category })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn day_off(server: &TestServer, client: &Client, day: usize) {
    let (status, _) = send(
        client
            .post(format!("{}/api/week/day-off", server.base_url))
            .json(&json!({ "day": day })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn set_dates(server: &TestServer, client: &Client, start: &str, end: &str) {
    let (status, _) = send(
        client
            .put(format!("{}/api/week/dates", server.base_url))
            .json(&json!({ "start": start, "end": end })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn http_empty_week_has_no_stats() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;

    let (status, view) = send(client.get(format!("{}/api/week", server.base_url))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["started"], json!(false));
    assert_eq!(view["stats"], Value::Null);
    assert_eq!(view["week"]["days"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn http_mixed_week_statistics() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;

    for category in 0..5 {
        toggle(&server, &client, 0, category).await;
    }
    toggle(&server, &client, 1, 0).await;
    toggle(&server, &client, 1, 3).await;
    for day in 2..5 {
        day_off(&server, &client, day).await;
    }

    let (_, view) = send(client.get(format!("{}/api/week", server.base_url))).await;
    let stats = &view["stats"];
    assert_eq!(stats["activeDays"], json!(2));
    assert_eq!(stats["totalPossible"], json!(10));
    assert_eq!(stats["totalChecked"], json!(7));
    assert_eq!(stats["percentage"], json!(70.0));
    assert_eq!(stats["perfectDays"], json!(1));
    assert_eq!(view["days"][0]["grade"], json!("perfect"));
    assert_eq!(view["days"][4]["grade"], json!("dayOff"));
    assert_eq!(view["week"]["days"][1]["toggles"], json!(["1", "0", "0", "1", "0"]));
}

#[tokio::test]
async fn http_out_of_range_toggle_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;

    let (status, _) = send(
        client
            .post(format!("{}/api/week/toggle", server.base_url))
            .json(&json!({ "day": 7, "category": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_archive_requires_dates() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;

    toggle(&server, &client, 0, 0).await;
    set_dates(&server, &client, "", "2026-01-09").await;

    let (status, _) = send(client.post(format!("{}/api/week/archive", server.base_url))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, view) = send(client.get(format!("{}/api/week", server.base_url))).await;
    assert_eq!(view["started"], json!(true));
    assert_eq!(view["week"]["days"][0]["toggles"][0], json!("1"));

    let (_, history) = send(client.get(format!("{}/api/history", server.base_url))).await;
    assert_eq!(history["weeks"], json!([]));
    assert_eq!(history["summary"], Value::Null);
}

#[tokio::test]
async fn http_archive_then_edit_history() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;

    set_dates(&server, &client, "2026-01-05", "2026-01-09").await;
    for day in 0..5 {
        for category in 0..5 {
            toggle(&server, &client, day, category).await;
        }
    }

    let (status, archived) = send(
        client
            .post(format!("{}/api/week/archive", server.base_url))
            .json(&json!({ "profit": "1500" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(archived["stats"]["percentage"], json!(100.0));
    assert_eq!(archived["stats"]["perfectDays"], json!(5));
    assert_eq!(archived["profit"], json!(1500.0));

    let (_, view) = send(client.get(format!("{}/api/week", server.base_url))).await;
    assert_eq!(view["started"], json!(false));

    let (status, history) = send(
        client
            .put(format!("{}/api/history/0/profit", server.base_url))
            .json(&json!({ "profit": -200 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["weeks"][0]["profit"], json!(-200.0));
    assert_eq!(history["weeks"][0]["stats"], archived["stats"]);
    assert_eq!(history["summary"]["totalWeeks"], json!(1));
    assert_eq!(history["summary"]["avgPercentage"], json!(100.0));

    let (_, charts) = send(client.get(format!("{}/api/history/charts", server.base_url))).await;
    assert_eq!(charts["trend"][0]["label"], json!("Week 1"));
    assert_eq!(charts["trend"][0]["profit"], json!(-200.0));
    assert_eq!(charts["categories"].as_array().unwrap().len(), 5);

    let (status, _) = send(
        client
            .post(format!("{}/api/history/5/delete", server.base_url))
            .json(&json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        client
            .post(format!("{}/api/history/0/delete", server.base_url))
            .json(&json!({ "confirm": false })),
    )
    .await;
    assert_eq!(status, StatusCode::PRECONDITION_REQUIRED);

    let (status, history) = send(
        client
            .post(format!("{}/api/history/0/delete", server.base_url))
            .json(&json!({ "confirm": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(history["weeks"], json!([]));
}

#[tokio::test]
async fn http_settings_are_clamped() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;

    let (_, defaults) = send(client.get(format!("{}/api/settings", server.base_url))).await;
    assert_eq!(defaults, json!({ "weeklyGoal": 75, "perfectDaysGoal": 2 }));

    let (status, saved) = send(
        client
            .put(format!("{}/api/settings", server.base_url))
            .json(&json!({ "weeklyGoal": "250", "perfectDaysGoal": "abc" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved, json!({ "weeklyGoal": 100, "perfectDaysGoal": 0 }));
}

#[tokio::test]
async fn http_sync_without_token_is_refused() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    fresh(&server, &client).await;
    let (status, _) = send(client.post(format!("{}/api/sync/token/remove", server.base_url))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(client.post(format!("{}/api/sync/push", server.base_url))).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    let (status, _) = send(client.post(format!("{}/api/sync/pull", server.base_url))).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);

    let (_, sync) = send(client.get(format!("{}/api/sync/status", server.base_url))).await;
    assert_eq!(sync["phase"], json!("idle"));
    assert_eq!(sync["hasToken"], json!(false));
    assert_eq!(sync["last"]["success"], json!(false));
}
