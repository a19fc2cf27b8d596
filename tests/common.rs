#![allow(missing_docs, dead_code)]

//! Helpers for driving a server instance over a real socket, speaking the
//! protocol the way a thin client would.

use ftpdlib::Server;
use ftpdlib::auth::{Perm, UserRegistry};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "s3cret";

// Grabs a port that was free a moment ago. Good enough for tests.
pub fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

// Spawns a server rooted at `home` with a full-permission test user and an
// anonymous account, and returns its address. Login failures are answered
// without the anti-brute-force delay so tests stay fast.
pub async fn spawn_server(home: &std::path::Path) -> String {
    let mut users = UserRegistry::new();
    users.add_user(USERNAME, PASSWORD, home, Perm::all()).unwrap();
    users.add_anonymous(home).unwrap();
    spawn_server_with(home, users).await
}

pub async fn spawn_server_with(_home: &std::path::Path, users: UserRegistry) -> String {
    let port = free_port();
    let addr = format!("127.0.0.1:{port}");
    let server = Server::with_authorizer(users)
        .greeting("Welcome test")
        .auth_failed_delay(Duration::ZERO)
        .build()
        .unwrap();
    let listen_addr = addr.clone();
    tokio::spawn(async move {
        server.listen(listen_addr).await.unwrap();
    });
    wait_until_up(&addr).await;
    addr
}

async fn wait_until_up(addr: &str) {
    for _ in 0..50 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {addr} did not come up");
}

pub struct Client {
    stream: BufReader<TcpStream>,
}

impl Client {
    // Connects and consumes the 220 greeting.
    pub async fn connect(addr: &str) -> Client {
        let stream = TcpStream::connect(addr).await.unwrap();
        let mut client = Client {
            stream: BufReader::new(stream),
        };
        let greeting = client.read_reply().await;
        assert!(greeting.starts_with("220 "), "unexpected greeting: {greeting}");
        client
    }

    pub async fn send(&mut self, line: &str) {
        self.stream.get_mut().write_all(format!("{line}\r\n").as_bytes()).await.unwrap();
    }

    // Reads one complete (possibly multi-line) reply and returns it with the
    // line terminators stripped per line.
    pub async fn read_reply(&mut self) -> String {
        let mut first = String::new();
        if self.stream.read_line(&mut first).await.unwrap() == 0 {
            return String::new();
        }
        let mut reply = first.trim_end().to_string();
        if first.len() >= 4 && first.as_bytes()[3] == b'-' {
            let code = &first[..3].to_string();
            loop {
                let mut line = String::new();
                if self.stream.read_line(&mut line).await.unwrap() == 0 {
                    break;
                }
                reply.push('\n');
                reply.push_str(line.trim_end());
                if line.len() >= 4 && line.starts_with(code.as_str()) && line.as_bytes()[3] == b' ' {
                    break;
                }
            }
        }
        reply
    }

    pub async fn cmd(&mut self, line: &str) -> String {
        self.send(line).await;
        self.read_reply().await
    }

    // Logs in with the standard test account.
    pub async fn login(&mut self) {
        let reply = self.cmd(&format!("USER {USERNAME}")).await;
        assert!(reply.starts_with("331 "), "USER: {reply}");
        let reply = self.cmd(&format!("PASS {PASSWORD}")).await;
        assert!(reply.starts_with("230"), "PASS: {reply}");
    }

    // Issues PASV and opens the data connection it advertises.
    pub async fn open_passive(&mut self) -> TcpStream {
        let reply = self.cmd("PASV").await;
        assert!(reply.starts_with("227 "), "PASV: {reply}");
        let addr = parse_pasv_reply(&reply);
        TcpStream::connect(addr).await.unwrap()
    }

    // True when the server has dropped the connection on us.
    pub async fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.stream.get_mut().read(&mut buf).await, Ok(0))
    }
}

pub fn parse_pasv_reply(reply: &str) -> String {
    let inner = reply.split('(').nth(1).unwrap().split(')').next().unwrap();
    let fields: Vec<u16> = inner.split(',').map(|f| f.parse().unwrap()).collect();
    assert_eq!(fields.len(), 6, "bad PASV reply: {reply}");
    format!("{}.{}.{}.{}:{}", fields[0], fields[1], fields[2], fields[3], fields[4] * 256 + fields[5])
}

pub async fn read_to_end(mut data: TcpStream) -> Vec<u8> {
    let mut out = Vec::new();
    data.read_to_end(&mut out).await.unwrap();
    out
}
