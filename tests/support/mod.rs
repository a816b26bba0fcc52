//! In-process mock of a browser's remote debugging endpoint.
//!
//! One listener serves both surfaces: `/devtools/page/{id}` upgrades to a
//! WebSocket for known targets, everything else is answered as plain HTTP.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dia_browser_control::cdp::{CdpConfig, CdpExecutor, Remediation, Target};
use dia_browser_control::dispatch::Dispatcher;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;

/// Produces the raw text frames sent back for one command.
pub type Responder = Arc<dyn Fn(&str, &Value) -> Vec<String> + Send + Sync>;

/// Something the mock observed, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Seen {
    Http { verb: String, path: String },
    Command { target: String, method: String, params: Value },
    Close { target: String },
}

#[derive(Default)]
struct State {
    targets: Vec<Target>,
    seen: Vec<Seen>,
    created: usize,
}

pub struct MockBrowser {
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    handle: JoinHandle<()>,
}

impl std::fmt::Debug for MockBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBrowser")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl Drop for MockBrowser {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl MockBrowser {
    pub async fn start(targets: Vec<Target>) -> Self {
        Self::start_with(targets, Arc::new(standard_reply)).await
    }

    pub async fn start_with(targets: Vec<Target>, responder: Responder) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(State {
            targets,
            ..State::default()
        }));

        let shared = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = Arc::clone(&shared);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    handle_connection(stream, addr, state, responder).await;
                });
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn config(&self, command_timeout: Duration) -> CdpConfig {
        CdpConfig {
            host: "127.0.0.1".into(),
            port: self.port(),
            command_timeout,
        }
    }

    pub fn dispatcher(&self, command_timeout: Duration) -> Dispatcher {
        dispatcher_for(self.config(command_timeout))
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.state.lock().unwrap().seen.clone()
    }

    pub fn targets(&self) -> Vec<Target> {
        self.state.lock().unwrap().targets.clone()
    }

    pub fn add_target(&self, target: Target) {
        self.state.lock().unwrap().targets.push(target);
    }

    /// `(method, params)` of every WebSocket command, in order.
    pub fn commands(&self) -> Vec<(String, Value)> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Command { method, params, .. } => Some((method, params)),
                _ => None,
            })
            .collect()
    }

    /// `"VERB path"` of every HTTP request, in order.
    pub fn http_requests(&self) -> Vec<String> {
        self.seen()
            .into_iter()
            .filter_map(|s| match s {
                Seen::Http { verb, path } => Some(format!("{verb} {path}")),
                _ => None,
            })
            .collect()
    }

    pub fn closes(&self) -> usize {
        self.seen()
            .iter()
            .filter(|s| matches!(s, Seen::Close { .. }))
            .count()
    }

    /// Wait until at least `n` close frames arrived, or two seconds pass.
    pub async fn wait_for_closes(&self, n: usize) -> usize {
        for _ in 0..40 {
            if self.closes() >= n {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.closes()
    }
}

pub fn remediation(port: u16) -> Remediation {
    Remediation {
        browser_name: "Dia Browser".into(),
        executable: Some("/Applications/Dia.app/Contents/MacOS/Dia".into()),
        port,
    }
}

pub fn dispatcher_for(config: CdpConfig) -> Dispatcher {
    let port = config.port;
    Dispatcher::new(CdpExecutor::new(config).unwrap(), remediation(port))
}

/// A port nothing listens on.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

pub fn target(id: &str, kind: &str, url: &str, title: &str) -> Target {
    Target {
        id: id.into(),
        target_type: kind.into(),
        title: title.into(),
        url: url.into(),
        ws_debugger_url: None,
    }
}

pub fn page(id: &str, url: &str, title: &str) -> Target {
    target(id, "page", url, title)
}

pub fn reply(cmd: &Value, result: Value) -> String {
    json!({ "id": cmd["id"], "result": result }).to_string()
}

pub fn error_reply(cmd: &Value, code: i64, message: &str) -> String {
    json!({ "id": cmd["id"], "error": { "code": code, "message": message } }).to_string()
}

/// Plausible answers for the commands the dispatcher sends.
pub fn standard_reply(_target: &str, cmd: &Value) -> Vec<String> {
    let method = cmd["method"].as_str().unwrap_or_default();
    let result = match method {
        "Page.navigate" => json!({ "frameId": "F1", "loaderId": "L1" }),
        "Page.reload" | "Page.navigateToHistoryEntry" => json!({}),
        "Page.getNavigationHistory" => json!({
            "currentIndex": 0,
            "entries": [
                { "id": 1, "url": "https://start.test/", "title": "Start" },
                { "id": 2, "url": "https://next.test/", "title": "Next" }
            ]
        }),
        "Runtime.evaluate" => evaluate(cmd["params"]["expression"].as_str().unwrap_or_default()),
        _ => return vec![error_reply(cmd, -32601, &format!("'{method}' wasn't found"))],
    };
    vec![reply(cmd, result)]
}

fn evaluate(expression: &str) -> Value {
    if expression.contains("throw") {
        return json!({
            "result": { "type": "object", "subtype": "error", "description": "Error: boom" },
            "exceptionDetails": {
                "exceptionId": 1,
                "text": "Uncaught",
                "lineNumber": 0,
                "columnNumber": 6,
                "exception": {
                    "type": "object",
                    "subtype": "error",
                    "description": "Error: boom\n    at <anonymous>:1:7"
                }
            }
        });
    }
    if expression.contains("document.body") {
        return json!({ "result": { "type": "string", "value": "Welcome Docs [https://docs.test/]" } });
    }
    match expression {
        "1 + 1" => json!({ "result": { "type": "number", "value": 2, "description": "2" } }),
        "void 0" => json!({ "result": { "type": "undefined" } }),
        "({a: [1, 2]})" => json!({ "result": { "type": "object", "value": { "a": [1, 2] } } }),
        _ => json!({ "result": { "type": "string", "value": expression } }),
    }
}

// =============================================================================
// Connection handling
// =============================================================================

async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    state: Arc<Mutex<State>>,
    responder: Responder,
) {
    let Some((verb, path)) = peek_request_line(&stream).await else {
        return;
    };

    if let Some(id) = path.strip_prefix("/devtools/page/") {
        let id = id.to_owned();
        let known = state.lock().unwrap().targets.iter().any(|t| t.id == id);
        if known {
            serve_socket(stream, id, state, responder).await;
        } else {
            let _ = read_head(&mut stream).await;
            write_response(&mut stream, 404, "Not Found", "text/plain", "").await;
        }
        return;
    }

    let _ = read_head(&mut stream).await;
    state.lock().unwrap().seen.push(Seen::Http {
        verb: verb.clone(),
        path: path.clone(),
    });
    let (status, content_type, body) = route(&verb, &path, addr, &state);
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        405 => "Method Not Allowed",
        _ => "Internal Server Error",
    };
    write_response(&mut stream, status, reason, content_type, &body).await;
}

async fn peek_request_line(stream: &TcpStream) -> Option<(String, String)> {
    let mut buf = [0u8; 1024];
    for _ in 0..200 {
        let n = stream.peek(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        let text = String::from_utf8_lossy(&buf[..n]);
        if let Some(line) = text.split("\r\n").next().filter(|_| text.contains("\r\n")) {
            let mut parts = line.split(' ');
            let verb = parts.next()?.to_owned();
            let path = parts.next()?.to_owned();
            return Some((verb, path));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}

async fn read_head(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    Ok(())
}

async fn write_response(
    stream: &mut TcpStream,
    status: u16,
    reason: &str,
    content_type: &str,
    body: &str,
) {
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

fn route(
    verb: &str,
    path: &str,
    addr: SocketAddr,
    state: &Arc<Mutex<State>>,
) -> (u16, &'static str, String) {
    const JSON: &str = "application/json; charset=UTF-8";
    const TEXT: &str = "text/plain; charset=UTF-8";

    let (route, query) = path.split_once('?').unwrap_or((path, ""));
    let mut state = state.lock().unwrap();

    match route {
        "/json" | "/json/list" => (200, JSON, serde_json::to_string(&state.targets).unwrap()),
        "/json/version" => (
            200,
            JSON,
            json!({
                "Browser": "Chrome/126.0.6478.127",
                "Protocol-Version": "1.3",
                "User-Agent": "Mozilla/5.0 (Macintosh) Dia/1.0",
                "V8-Version": "12.6.228.28",
                "WebKit-Version": "537.36",
                "webSocketDebuggerUrl": format!("ws://{addr}/devtools/browser/mock")
            })
            .to_string(),
        ),
        "/json/new" if verb != "PUT" => (
            405,
            TEXT,
            "Using unsafe HTTP verb GET to invoke /json/new. This action supports only PUT verb."
                .to_owned(),
        ),
        "/json/new" => {
            state.created += 1;
            let id = format!("NEW{}", state.created);
            let url = urlencoding::decode(query)
                .map(|u| u.into_owned())
                .unwrap_or_default();
            let mut created = page(&id, &url, "");
            created.ws_debugger_url = Some(format!("ws://{addr}/devtools/page/{id}"));
            state.targets.push(created.clone());
            (200, JSON, serde_json::to_string(&created).unwrap())
        }
        "/echo" => (
            200,
            JSON,
            json!({ "verb": verb, "path": route, "query": query }).to_string(),
        ),
        "/plain" => (200, TEXT, "plain body".to_owned()),
        _ => {
            if let Some(id) = route.strip_prefix("/json/close/") {
                match state.targets.iter().position(|t| t.id == id) {
                    Some(index) => {
                        state.targets.remove(index);
                        (200, TEXT, "Target is closing".to_owned())
                    }
                    None => (404, TEXT, format!("No such target id: {id}")),
                }
            } else if let Some(id) = route.strip_prefix("/json/activate/") {
                match state.targets.iter().position(|t| t.id == id) {
                    Some(index) => {
                        let activated = state.targets.remove(index);
                        state.targets.insert(0, activated);
                        (200, TEXT, "Target activated".to_owned())
                    }
                    None => (404, TEXT, format!("No such target id: {id}")),
                }
            } else {
                (404, TEXT, format!("Unknown command: {route}"))
            }
        }
    }
}

async fn serve_socket(
    stream: TcpStream,
    target: String,
    state: Arc<Mutex<State>>,
    responder: Responder,
) {
    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    while let Some(Ok(msg)) = ws.next().await {
        match msg {
            Message::Text(text) => {
                let cmd: Value = serde_json::from_str(&text).unwrap();
                state.lock().unwrap().seen.push(Seen::Command {
                    target: target.clone(),
                    method: cmd["method"].as_str().unwrap_or_default().to_owned(),
                    params: cmd["params"].clone(),
                });
                for frame in responder(&target, &cmd) {
                    if ws.send(Message::Text(frame.into())).await.is_err() {
                        return;
                    }
                }
            }
            Message::Close(_) => {
                state.lock().unwrap().seen.push(Seen::Close {
                    target: target.clone(),
                });
            }
            _ => {}
        }
    }
}
