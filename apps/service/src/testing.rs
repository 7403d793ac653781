//! In-process fakes for the injected capabilities, sink and transports.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::database::ResultSink;
use crate::monitoring::CheckResult;
use crate::monitoring::checker::{
    HttpClient, HttpResponse, Pinger, QueryConnection, QueryDriver, Resolver,
};
use crate::notify::{EmailMessage, MailTransport, SmsMessage, SmsTransport};
use crate::orchestrator::Sleeper;

/// Canned responses by URL; unknown URLs fail like a refused connection and
/// URLs containing `panic` panic
#[derive(Default)]
pub struct FakeHttp {
    routes: HashMap<String, HttpResponse>,
}

impl FakeHttp {
    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(url.into(), HttpResponse { status, body: body.as_bytes().to_vec() });
        self
    }
}

#[async_trait]
impl HttpClient for FakeHttp {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        if url.contains("panic") {
            panic!("fake http client asked to panic for {url}");
        }
        self.routes.get(url).cloned().ok_or_else(|| anyhow!("connection refused"))
    }
}

#[derive(Default)]
pub struct FakeResolver {
    records: HashMap<String, Vec<Ipv4Addr>>,
}

impl FakeResolver {
    pub fn record(mut self, name: &str, addresses: &[&str]) -> Self {
        let addresses = addresses.iter().map(|a| a.parse().expect("test address")).collect();
        self.records.insert(name.into(), addresses);
        self
    }
}

#[async_trait]
impl Resolver for FakeResolver {
    async fn resolve_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        self.records.get(name).cloned().ok_or_else(|| anyhow!("queryA ENOTFOUND {name}"))
    }
}

#[derive(Default)]
pub struct FakePinger {
    reachable: HashSet<IpAddr>,
}

impl FakePinger {
    pub fn reachable(addresses: &[&str]) -> Self {
        Self { reachable: addresses.iter().map(|a| a.parse().expect("test address")).collect() }
    }
}

#[async_trait]
impl Pinger for FakePinger {
    async fn ping(&self, ip: IpAddr, _port: u16) -> Result<()> {
        if self.reachable.contains(&ip) {
            Ok(())
        } else {
            bail!("TCP connection timeout")
        }
    }
}

/// Counts released connections so scoped cleanup can be asserted
#[derive(Default)]
pub struct FakeDriver {
    pub fail_connect: bool,
    pub fail_query: bool,
    pub released: Arc<AtomicUsize>,
}

struct FakeConnection {
    fail_query: bool,
    released: Arc<AtomicUsize>,
}

impl Drop for FakeConnection {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl QueryDriver for FakeDriver {
    async fn connect(&self, _connection: &str, _auth_token: Option<&str>) -> Result<Box<dyn QueryConnection>> {
        if self.fail_connect {
            bail!("connection refused");
        }
        Ok(Box::new(FakeConnection { fail_query: self.fail_query, released: self.released.clone() }))
    }
}

#[async_trait]
impl QueryConnection for FakeConnection {
    async fn execute(&self, _query: &str) -> Result<()> {
        if self.fail_query {
            bail!("no such table: orders");
        }
        Ok(())
    }
}

/// Records every batch; a failing sink still counts the attempt
#[derive(Default)]
pub struct MemorySink {
    batches: Mutex<Vec<Vec<CheckResult>>>,
    attempts: AtomicUsize,
    fail: bool,
}

impl MemorySink {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn batches(&self) -> Vec<Vec<CheckResult>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn insert(&self, records: &[CheckResult]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("disk I/O error");
        }
        self.batches.lock().unwrap().push(records.to_vec());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        if self.fail {
            bail!("mail relay unavailable");
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSms {
    sent: Mutex<Vec<SmsMessage>>,
}

impl RecordingSms {
    pub fn sent(&self) -> Vec<SmsMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SmsTransport for RecordingSms {
    async fn send_message(&self, message: &SmsMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Returns immediately for the first `limit` sleeps, reporting each one on a
/// channel, then never wakes again
pub struct StepSleeper {
    limit: usize,
    calls: AtomicUsize,
    tx: mpsc::UnboundedSender<Duration>,
}

impl StepSleeper {
    pub fn new(limit: usize) -> (Self, mpsc::UnboundedReceiver<Duration>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { limit, calls: AtomicUsize::new(0), tx }, rx)
    }
}

#[async_trait]
impl Sleeper for StepSleeper {
    async fn sleep(&self, duration: Duration) {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = self.tx.send(duration);
        if call >= self.limit {
            std::future::pending::<()>().await;
        }
    }
}

/// Serve a single HTTP response on a local port.
///
/// Returns the base URL and a handle resolving to the raw request text.
pub async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    serve_with_headers(status, "", body).await
}

/// Like [`serve_once`], with extra CRLF-terminated header lines
pub async fn serve_with_headers(
    status: u16,
    headers: &'static str,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<String>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
    let url = format!("http://{}/", listener.local_addr().expect("local addr"));

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let read = socket.read(&mut buf).await.expect("read request");
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);

            let text = String::from_utf8_lossy(&request);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= header_end + 4 + content_length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {status} Test\r\n{headers}Content-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write response");
        socket.shutdown().await.ok();

        String::from_utf8_lossy(&request).into_owned()
    });

    (url, handle)
}
