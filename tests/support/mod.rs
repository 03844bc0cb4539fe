//! In-process mock key-value store for integration tests.
//!
//! Speaks the store's textual protocol subset (AUTH, PING, GET, SET,
//! SETEX, DEL, EXISTS, KEYS) over a local TCP listener, with a
//! controllable clock so TTL expiry is simulated by advancing time
//! instead of sleeping.
#![allow(dead_code)] // each test binary uses its own subset

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufStream};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

// == Stored Entry ==
struct StoredEntry {
    value: Vec<u8>,
    /// Expiration timestamp (mock-clock milliseconds), None = no expiration
    expires_at: Option<u64>,
}

struct Shared {
    entries: Mutex<HashMap<String, StoredEntry>>,
    /// Milliseconds added to the wall clock by `advance`
    clock_skew_ms: AtomicU64,
    /// Total connections ever accepted
    connections: AtomicUsize,
    password: Option<String>,
}

impl Shared {
    fn now_ms(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Time went backwards")
            .as_millis() as u64;
        wall + self.clock_skew_ms.load(Ordering::SeqCst)
    }

    fn is_expired(&self, entry: &StoredEntry) -> bool {
        match entry.expires_at {
            Some(expires) => self.now_ms() >= expires,
            None => false,
        }
    }
}

// == Mock Store ==
pub struct MockStore {
    addr: SocketAddr,
    shared: Arc<Shared>,
    accept_task: JoinHandle<()>,
    conn_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl MockStore {
    /// Starts a store with no authentication on an ephemeral port.
    pub async fn spawn() -> Self {
        Self::spawn_inner(None).await
    }

    /// Starts a store that requires AUTH before any other command.
    pub async fn spawn_with_password(password: &str) -> Self {
        Self::spawn_inner(Some(password.to_string())).await
    }

    async fn spawn_inner(password: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            clock_skew_ms: AtomicU64::new(0),
            connections: AtomicUsize::new(0),
            password,
        });

        let conn_tasks: Arc<Mutex<Vec<JoinHandle<()>>>> = Arc::new(Mutex::new(Vec::new()));
        let accept_task = tokio::spawn(accept_loop(listener, shared.clone(), conn_tasks.clone()));

        Self {
            addr,
            shared,
            accept_task,
            conn_tasks,
        }
    }

    /// Store address as `host:port`.
    pub fn addr(&self) -> String {
        self.addr.to_string()
    }

    /// Advances the store's clock; entries whose TTL elapses become
    /// absent on their next access.
    pub fn advance(&self, by: Duration) {
        self.shared
            .clock_skew_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Total number of connections the store has accepted.
    pub fn connection_count(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Inserts raw bytes directly, bypassing the protocol.
    pub async fn insert_raw(&self, key: &str, value: &[u8]) {
        self.shared.entries.lock().await.insert(
            key.to_string(),
            StoredEntry {
                value: value.to_vec(),
                expires_at: None,
            },
        );
    }

    /// Whether a live (unexpired) entry exists for the key.
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.shared.entries.lock().await;
        entries
            .get(key)
            .map(|entry| !self.shared.is_expired(entry))
            .unwrap_or(false)
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.shared.entries.lock().await;
        entries
            .values()
            .filter(|entry| !self.shared.is_expired(entry))
            .count()
    }

    /// Severs every open connection, leaving stored entries intact.
    /// Pooled client connections become stale.
    pub async fn drop_connections(&self) {
        let mut tasks = self.conn_tasks.lock().await;
        for task in tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for MockStore {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

// == Server Loops ==
async fn accept_loop(
    listener: TcpListener,
    shared: Arc<Shared>,
    conn_tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
) {
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            break;
        };
        shared.connections.fetch_add(1, Ordering::SeqCst);
        let task = tokio::spawn(serve_connection(stream, shared.clone()));
        conn_tasks.lock().await.push(task);
    }
}

async fn serve_connection(stream: TcpStream, shared: Arc<Shared>) {
    let mut stream = BufStream::new(stream);
    let mut authed = shared.password.is_none();

    while let Some(parts) = read_command(&mut stream).await {
        let reply = dispatch(&parts, &mut authed, &shared).await;
        if stream.write_all(&reply).await.is_err() {
            break;
        }
        if stream.flush().await.is_err() {
            break;
        }
    }
}

/// Reads one `*N` array of bulk strings. None on EOF or framing error.
async fn read_command(stream: &mut BufStream<TcpStream>) -> Option<Vec<Vec<u8>>> {
    let header = read_line(stream).await?;
    let count: usize = header.strip_prefix('*')?.parse().ok()?;

    let mut parts = Vec::with_capacity(count);
    for _ in 0..count {
        let len_line = read_line(stream).await?;
        let len: usize = len_line.strip_prefix('$')?.parse().ok()?;

        let mut payload = vec![0u8; len];
        stream.read_exact(&mut payload).await.ok()?;
        let mut crlf = [0u8; 2];
        stream.read_exact(&mut crlf).await.ok()?;

        parts.push(payload);
    }
    Some(parts)
}

async fn read_line(stream: &mut BufStream<TcpStream>) -> Option<String> {
    let mut line = Vec::new();
    let read = stream.read_until(b'\n', &mut line).await.ok()?;
    if read == 0 {
        return None;
    }
    while line.ends_with(b"\n") || line.ends_with(b"\r") {
        line.pop();
    }
    String::from_utf8(line).ok()
}

// == Command Dispatch ==
async fn dispatch(parts: &[Vec<u8>], authed: &mut bool, shared: &Shared) -> Vec<u8> {
    let Some(first) = parts.first() else {
        return error("ERR empty command");
    };
    let command = String::from_utf8_lossy(first).to_ascii_uppercase();

    if command == "AUTH" {
        let supplied = parts.get(1).map(|p| String::from_utf8_lossy(p).into_owned());
        return match (&shared.password, supplied) {
            (Some(expected), Some(given)) if *expected == given => {
                *authed = true;
                simple("OK")
            }
            (None, _) => error("ERR Client sent AUTH, but no password is set"),
            _ => error("ERR invalid password"),
        };
    }

    if !*authed {
        return error("NOAUTH Authentication required.");
    }

    match command.as_str() {
        "PING" => simple("PONG"),

        "GET" => {
            let Some(key) = arg(parts, 1) else {
                return error("ERR wrong number of arguments for 'get'");
            };
            let mut entries = shared.entries.lock().await;
            match entries.get(&key) {
                Some(entry) if shared.is_expired(entry) => {
                    entries.remove(&key);
                    nil()
                }
                Some(entry) => bulk(&entry.value),
                None => nil(),
            }
        }

        "SET" => {
            let (Some(key), Some(value)) = (arg(parts, 1), parts.get(2)) else {
                return error("ERR wrong number of arguments for 'set'");
            };
            shared.entries.lock().await.insert(
                key,
                StoredEntry {
                    value: value.clone(),
                    expires_at: None,
                },
            );
            simple("OK")
        }

        "SETEX" => {
            let (Some(key), Some(secs), Some(value)) = (arg(parts, 1), arg(parts, 2), parts.get(3))
            else {
                return error("ERR wrong number of arguments for 'setex'");
            };
            let Ok(secs) = secs.parse::<u64>() else {
                return error("ERR value is not an integer or out of range");
            };
            if secs == 0 {
                return error("ERR invalid expire time in 'setex' command");
            }
            let expires_at = shared.now_ms() + secs * 1000;
            shared.entries.lock().await.insert(
                key,
                StoredEntry {
                    value: value.clone(),
                    expires_at: Some(expires_at),
                },
            );
            simple("OK")
        }

        "DEL" => {
            let mut entries = shared.entries.lock().await;
            let mut removed = 0i64;
            for part in &parts[1..] {
                let key = String::from_utf8_lossy(part).into_owned();
                let live = entries
                    .get(&key)
                    .map(|entry| !shared.is_expired(entry))
                    .unwrap_or(false);
                if entries.remove(&key).is_some() && live {
                    removed += 1;
                }
            }
            integer(removed)
        }

        "EXISTS" => {
            let Some(key) = arg(parts, 1) else {
                return error("ERR wrong number of arguments for 'exists'");
            };
            let mut entries = shared.entries.lock().await;
            match entries.get(&key) {
                Some(entry) if shared.is_expired(entry) => {
                    entries.remove(&key);
                    integer(0)
                }
                Some(_) => integer(1),
                None => integer(0),
            }
        }

        "KEYS" => {
            let Some(pattern) = arg(parts, 1) else {
                return error("ERR wrong number of arguments for 'keys'");
            };
            let entries = shared.entries.lock().await;
            let mut matched: Vec<&String> = entries
                .iter()
                .filter(|(key, entry)| {
                    !shared.is_expired(entry) && glob_match(&pattern, key)
                })
                .map(|(key, _)| key)
                .collect();
            matched.sort();

            let mut reply = format!("*{}\r\n", matched.len()).into_bytes();
            for key in matched {
                reply.extend_from_slice(&bulk(key.as_bytes()));
            }
            reply
        }

        _ => error(&format!("ERR unknown command '{}'", command)),
    }
}

fn arg(parts: &[Vec<u8>], index: usize) -> Option<String> {
    parts
        .get(index)
        .map(|p| String::from_utf8_lossy(p).into_owned())
}

// == Reply Builders ==
fn simple(text: &str) -> Vec<u8> {
    format!("+{}\r\n", text).into_bytes()
}

fn error(text: &str) -> Vec<u8> {
    format!("-{}\r\n", text).into_bytes()
}

fn integer(n: i64) -> Vec<u8> {
    format!(":{}\r\n", n).into_bytes()
}

fn bulk(payload: &[u8]) -> Vec<u8> {
    let mut reply = format!("${}\r\n", payload.len()).into_bytes();
    reply.extend_from_slice(payload);
    reply.extend_from_slice(b"\r\n");
    reply
}

fn nil() -> Vec<u8> {
    b"$-1\r\n".to_vec()
}

// == Glob Matching ==
/// Matches `*` as an any-length wildcard; every other character is
/// literal.
fn glob_match(pattern: &str, text: &str) -> bool {
    let segments: Vec<&str> = pattern.split('*').collect();
    if segments.len() == 1 {
        return pattern == text;
    }

    let mut rest = match text.strip_prefix(segments[0]) {
        Some(rest) => rest,
        None => return false,
    };

    for segment in &segments[1..segments.len() - 1] {
        if segment.is_empty() {
            continue;
        }
        match rest.find(segment) {
            Some(at) => rest = &rest[at + segment.len()..],
            None => return false,
        }
    }

    let last = segments[segments.len() - 1];
    last.is_empty() || rest.ends_with(last)
}
