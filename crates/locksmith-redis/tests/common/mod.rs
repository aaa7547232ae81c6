//! Scripted in-process Redis server
//!
//! Answers the handful of commands the lease store and the client handshake
//! issue, keeps data in a shared map and records which commands arrived. A
//! test can ask it to stall its next reply or to drop the connection instead
//! of answering.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Buf, BytesMut};
use locksmith_redis::RedisStoreConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Default)]
struct Shared {
    data: Mutex<HashMap<Vec<u8>, Vec<u8>>>,
    log: Mutex<Vec<String>>,
    delay_next: Mutex<Option<Duration>>,
    hangup_next: AtomicBool,
    connections: AtomicUsize,
}

pub struct FakeRedis {
    addr: SocketAddr,
    shared: Arc<Shared>,
}

impl FakeRedis {
    pub async fn start(password: Option<&'static str>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shared: Arc<Shared> = Arc::default();

        tokio::spawn({
            let shared = shared.clone();
            async move {
                while let Ok((socket, _)) = listener.accept().await {
                    shared.connections.fetch_add(1, Ordering::SeqCst);
                    tokio::spawn(serve(socket, shared.clone(), password));
                }
            }
        });

        Self { addr, shared }
    }

    pub fn config(&self) -> RedisStoreConfig {
        RedisStoreConfig::new(self.addr.ip().to_string(), self.addr.port())
            .with_connect_retries(0)
    }

    /// Data commands received so far. Handshake `CLIENT` calls are not recorded.
    pub fn commands(&self) -> Vec<String> {
        self.shared.log.lock().unwrap().clone()
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.shared
            .data
            .lock()
            .unwrap()
            .get(key.as_bytes())
            .map(|v| String::from_utf8_lossy(v).into_owned())
    }

    pub fn insert(&self, key: &str, value: &str) {
        self.shared
            .data
            .lock()
            .unwrap()
            .insert(key.as_bytes().to_vec(), value.as_bytes().to_vec());
    }

    pub fn connections(&self) -> usize {
        self.shared.connections.load(Ordering::SeqCst)
    }

    /// Hold back the reply to the next data command for `delay`.
    pub fn delay_next_reply(&self, delay: Duration) {
        *self.shared.delay_next.lock().unwrap() = Some(delay);
    }

    /// Close the connection when the next data command arrives, without replying.
    pub fn hang_up_on_next_command(&self) {
        self.shared.hangup_next.store(true, Ordering::SeqCst);
    }
}

enum Reply {
    Status(&'static str),
    Error(String),
    Integer(i64),
    Bulk(Option<Vec<u8>>),
}

impl Reply {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Reply::Status(s) => out.extend_from_slice(format!("+{}\r\n", s).as_bytes()),
            Reply::Error(e) => out.extend_from_slice(format!("-{}\r\n", e).as_bytes()),
            Reply::Integer(n) => out.extend_from_slice(format!(":{}\r\n", n).as_bytes()),
            Reply::Bulk(None) => out.extend_from_slice(b"$-1\r\n"),
            Reply::Bulk(Some(v)) => {
                out.extend_from_slice(format!("${}\r\n", v.len()).as_bytes());
                out.extend_from_slice(v);
                out.extend_from_slice(b"\r\n");
            }
        }
    }
}

async fn serve(mut socket: TcpStream, shared: Arc<Shared>, password: Option<&str>) {
    let mut buf = BytesMut::new();
    let mut authed = password.is_none();

    loop {
        while let Some((args, consumed)) = parse_request(&buf) {
            buf.advance(consumed);
            let name = String::from_utf8_lossy(&args[0]).to_uppercase();
            let handshake = matches!(name.as_str(), "CLIENT" | "AUTH" | "SELECT");

            if !handshake && shared.hangup_next.swap(false, Ordering::SeqCst) {
                return;
            }
            let delay = if handshake {
                None
            } else {
                shared.delay_next.lock().unwrap().take()
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let reply = handle(&name, &args, &shared, password, &mut authed);
            let mut out = Vec::new();
            reply.encode(&mut out);
            if socket.write_all(&out).await.is_err() {
                return;
            }
        }

        match socket.read_buf(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
    }
}

/// One `*N` array of `$len` bulk strings, with the number of bytes it took.
fn parse_request(buf: &[u8]) -> Option<(Vec<Vec<u8>>, usize)> {
    let (count, mut pos) = read_header(buf, 0, b'*')?;
    let mut args = Vec::with_capacity(count);
    for _ in 0..count {
        let (len, start) = read_header(buf, pos, b'$')?;
        let end = start + len;
        if buf.len() < end + 2 {
            return None;
        }
        args.push(buf[start..end].to_vec());
        pos = end + 2;
    }
    Some((args, pos))
}

fn read_header(buf: &[u8], pos: usize, marker: u8) -> Option<(usize, usize)> {
    if *buf.get(pos)? != marker {
        return None;
    }
    let line_len = buf[pos..].windows(2).position(|w| w == b"\r\n")?;
    let n = std::str::from_utf8(&buf[pos + 1..pos + line_len])
        .ok()?
        .parse()
        .ok()?;
    Some((n, pos + line_len + 2))
}

fn handle(
    name: &str,
    args: &[Vec<u8>],
    shared: &Shared,
    password: Option<&str>,
    authed: &mut bool,
) -> Reply {
    if name == "CLIENT" {
        return Reply::Status("OK");
    }
    shared.log.lock().unwrap().push(name.to_string());

    if name == "AUTH" {
        let given = args.last().map(|b| b.as_slice());
        return if given == password.map(str::as_bytes) {
            *authed = true;
            Reply::Status("OK")
        } else {
            Reply::Error("WRONGPASS invalid username-password pair".to_string())
        };
    }
    if !*authed {
        return Reply::Error("NOAUTH Authentication required.".to_string());
    }

    let mut data = shared.data.lock().unwrap();
    match name {
        "PING" => Reply::Status("PONG"),
        "SELECT" => Reply::Status("OK"),
        "SETNX" => {
            if data.contains_key(&args[1]) {
                Reply::Integer(0)
            } else {
                data.insert(args[1].clone(), args[2].clone());
                Reply::Integer(1)
            }
        }
        "GET" => Reply::Bulk(data.get(&args[1]).cloned()),
        "GETSET" => Reply::Bulk(data.insert(args[1].clone(), args[2].clone())),
        "DEL" => Reply::Integer(data.remove(&args[1]).is_some() as i64),
        _ => Reply::Error(format!("ERR unknown command '{}'", name)),
    }
}
