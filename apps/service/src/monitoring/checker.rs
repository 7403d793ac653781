//! Network and database capabilities used by the probes.
//!
//! Each trait is a single bounded call. The probe executor only ever talks to
//! these traits, so tests swap in fakes and never touch the network.

use anyhow::{Result, anyhow, bail};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::time::timeout;

/// Status and full body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait::async_trait]
pub trait HttpClient: Send + Sync {
    /// Issue a GET and read the complete response body
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

#[async_trait::async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve a host name to its IPv4 addresses
    async fn resolve_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>>;
}

#[async_trait::async_trait]
pub trait Pinger: Send + Sync {
    /// Succeeds when `ip:port` accepts a connection
    async fn ping(&self, ip: IpAddr, port: u16) -> Result<()>;
}

/// Opens per-invocation database connections for query probes
#[async_trait::async_trait]
pub trait QueryDriver: Send + Sync {
    async fn connect(
        &self,
        connection: &str,
        auth_token: Option<&str>,
    ) -> Result<Box<dyn QueryConnection>>;
}

/// An open connection; dropping it releases the connection
#[async_trait::async_trait]
pub trait QueryConnection: Send + Sync {
    async fn execute(&self, query: &str) -> Result<()>;
}

/// HTTP/HTTPS client backed by reqwest
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout_seconds: u64) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| anyhow!("HTTP request failed: {}", e))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| anyhow!("failed to read response body: {}", e))?;

        Ok(HttpResponse { status, body: body.to_vec() })
    }
}

/// Resolver backed by the system resolver (`getaddrinfo`)
#[derive(Debug, Default)]
pub struct DnsResolver;

#[async_trait::async_trait]
impl Resolver for DnsResolver {
    async fn resolve_ipv4(&self, name: &str) -> Result<Vec<Ipv4Addr>> {
        let addresses = tokio::net::lookup_host((name, 0))
            .await
            .map_err(|e| anyhow!("DNS lookup for {} failed: {}", name, e))?;

        let mut resolved = Vec::new();
        for address in addresses {
            if let IpAddr::V4(ip) = address.ip() {
                if !resolved.contains(&ip) {
                    resolved.push(ip);
                }
            }
        }

        Ok(resolved)
    }
}

/// TCP reachability checker
pub struct TcpPinger {
    timeout_duration: Duration,
}

impl TcpPinger {
    pub fn new(timeout_seconds: u64) -> Self {
        Self { timeout_duration: Duration::from_secs(timeout_seconds) }
    }
}

#[async_trait::async_trait]
impl Pinger for TcpPinger {
    async fn ping(&self, ip: IpAddr, port: u16) -> Result<()> {
        let connect = tokio::net::TcpStream::connect((ip, port));

        timeout(self.timeout_duration, connect)
            .await
            .map_err(|_| anyhow!("TCP connection timeout"))?
            .map_err(|e| anyhow!("TCP connection failed: {}", e))?;

        Ok(())
    }
}

/// Query driver for libsql/SQLite databases.
///
/// `libsql://`, `http://` and `https://` connection strings open a remote
/// database with the optional auth token; anything else is a local path.
/// Local databases must already exist and are never created by a check.
#[derive(Debug, Default)]
pub struct LibsqlDriver;

struct LibsqlConnection {
    conn: libsql::Connection,
    _database: libsql::Database,
}

fn is_remote(connection: &str) -> bool {
    ["libsql://", "http://", "https://"].iter().any(|scheme| connection.starts_with(scheme))
}

#[async_trait::async_trait]
impl QueryDriver for LibsqlDriver {
    async fn connect(
        &self,
        connection: &str,
        auth_token: Option<&str>,
    ) -> Result<Box<dyn QueryConnection>> {
        let database = if is_remote(connection) {
            libsql::Builder::new_remote(
                connection.to_string(),
                auth_token.unwrap_or_default().to_string(),
            )
            .build()
            .await?
        } else {
            if !tokio::fs::try_exists(connection).await.unwrap_or(false) {
                bail!("database {} does not exist", connection);
            }
            libsql::Builder::new_local(connection)
                .flags(libsql::OpenFlags::SQLITE_OPEN_READ_WRITE)
                .build()
                .await?
        };
        let conn = database.connect()?;

        Ok(Box::new(LibsqlConnection { conn, _database: database }))
    }
}

#[async_trait::async_trait]
impl QueryConnection for LibsqlConnection {
    async fn execute(&self, query: &str) -> Result<()> {
        let mut rows = self.conn.query(query, ()).await?;
        while rows.next().await?.is_some() {}
        Ok(())
    }
}
