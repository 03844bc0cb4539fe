//! Store Connection Module
//!
//! A single authenticated connection to the remote store, with typed
//! helpers for the command subset the cache engine uses.

use tokio::io::BufStream;
use tokio::net::TcpStream;

use crate::error::{CacheError, Result};
use crate::transport::resp::{self, Reply};

// == Connection ==
/// One live connection to the store.
#[derive(Debug)]
pub struct Connection {
    stream: BufStream<TcpStream>,
}

impl Connection {
    // == Connect ==
    /// Dials the store at `host:port`.
    pub async fn connect(addr: &str) -> Result<Self> {
        let stream = TcpStream::connect(addr).await.map_err(|err| {
            CacheError::Connectivity(format!("dial {} failed: {}", addr, err))
        })?;
        Ok(Self {
            stream: BufStream::new(stream),
        })
    }

    // == Raw Command ==
    /// Sends one command and reads its reply.
    ///
    /// A store-side error reply is surfaced as a connectivity error;
    /// the engine never interprets or retries it.
    pub async fn command(&mut self, parts: &[&[u8]]) -> Result<Reply> {
        resp::write_command(&mut self.stream, parts).await?;
        match resp::read_reply(&mut self.stream).await? {
            Reply::Error(message) => Err(CacheError::Connectivity(format!(
                "store error: {}",
                message
            ))),
            reply => Ok(reply),
        }
    }

    // == Command Helpers ==
    /// Authenticates with the configured shared secret.
    pub async fn auth(&mut self, password: &str) -> Result<()> {
        match self.command(&[b"AUTH", password.as_bytes()]).await? {
            Reply::Simple(_) => Ok(()),
            other => Err(unexpected("AUTH", &other)),
        }
    }

    /// No-op liveness probe.
    pub async fn ping(&mut self) -> Result<()> {
        match self.command(&[b"PING"]).await? {
            Reply::Simple(_) => Ok(()),
            other => Err(unexpected("PING", &other)),
        }
    }

    /// Fetches a payload. None is the nil reply (key absent), which is
    /// distinct from an empty stored payload.
    pub async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        match self.command(&[b"GET", key.as_bytes()]).await? {
            Reply::Bulk(payload) => Ok(payload),
            other => Err(unexpected("GET", &other)),
        }
    }

    /// Stores a payload without expiry.
    pub async fn set(&mut self, key: &str, value: &[u8]) -> Result<()> {
        match self.command(&[b"SET", key.as_bytes(), value]).await? {
            Reply::Simple(_) => Ok(()),
            other => Err(unexpected("SET", &other)),
        }
    }

    /// Stores a payload that the store expires after `seconds`.
    pub async fn setex(&mut self, key: &str, seconds: u64, value: &[u8]) -> Result<()> {
        let seconds = seconds.to_string();
        match self
            .command(&[b"SETEX", key.as_bytes(), seconds.as_bytes(), value])
            .await?
        {
            Reply::Simple(_) => Ok(()),
            other => Err(unexpected("SETEX", &other)),
        }
    }

    /// Deletes a key; returns whether anything was removed.
    pub async fn del(&mut self, key: &str) -> Result<bool> {
        match self.command(&[b"DEL", key.as_bytes()]).await? {
            Reply::Integer(n) => Ok(n > 0),
            other => Err(unexpected("DEL", &other)),
        }
    }

    /// Checks key presence.
    pub async fn exists(&mut self, key: &str) -> Result<bool> {
        match self.command(&[b"EXISTS", key.as_bytes()]).await? {
            Reply::Integer(n) => Ok(n > 0),
            other => Err(unexpected("EXISTS", &other)),
        }
    }

    /// Lists the keys currently matching a glob pattern.
    pub async fn keys(&mut self, pattern: &str) -> Result<Vec<String>> {
        match self.command(&[b"KEYS", pattern.as_bytes()]).await? {
            Reply::Array(elements) => {
                let mut keys = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Reply::Bulk(Some(bytes)) => {
                            keys.push(String::from_utf8_lossy(&bytes).into_owned());
                        }
                        Reply::Bulk(None) => {}
                        other => return Err(unexpected("KEYS", &other)),
                    }
                }
                Ok(keys)
            }
            // Some stores reply nil for no matches
            Reply::Bulk(None) => Ok(Vec::new()),
            other => Err(unexpected("KEYS", &other)),
        }
    }
}

fn unexpected(command: &str, reply: &Reply) -> CacheError {
    CacheError::Connectivity(format!("unexpected {} reply: {:?}", command, reply))
}
