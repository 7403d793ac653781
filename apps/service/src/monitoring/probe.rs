use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use super::validation::{validate_host_name, validate_http_target, validate_port, validate_query};
use crate::config::ConfigError;

/// Port used when pinging addresses found by a `resolve` probe
pub const DEFAULT_PING_PORT: u16 = 80;

/// Type of probe to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    Http,
    Json,
    Query,
    Resolve,
    Ping,
}

impl ProbeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeKind::Http => "http",
            ProbeKind::Json => "json",
            ProbeKind::Query => "query",
            ProbeKind::Resolve => "resolve",
            ProbeKind::Ping => "ping",
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProbeKind {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "http" => Ok(ProbeKind::Http),
            "json" => Ok(ProbeKind::Json),
            "query" | "mongo" => Ok(ProbeKind::Query),
            "resolve" => Ok(ProbeKind::Resolve),
            "ping" => Ok(ProbeKind::Ping),
            other => Err(ConfigError::UnknownProbe(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HttpOptions {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsonOptions {
    pub url: String,
    /// Document the response body must equal
    pub expected: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QueryOptions {
    pub connection: String,
    pub query: String,
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveOptions {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PingOptions {
    pub ip: IpAddr,
    #[serde(default = "default_ping_port")]
    pub port: u16,
}

fn default_ping_port() -> u16 {
    DEFAULT_PING_PORT
}

/// One configured probe instance, bound to its options
#[derive(Debug, Clone, PartialEq)]
pub enum Probe {
    Http(HttpOptions),
    Json(JsonOptions),
    Query(QueryOptions),
    Resolve(ResolveOptions),
    Ping(PingOptions),
}

impl Probe {
    /// Resolve a probe type name and its options
    pub fn from_config(kind: &str, options: toml::Value) -> Result<Self, ConfigError> {
        Self::resolve(kind.parse()?, options)
    }

    /// Bind validated options to a probe kind
    pub fn resolve(kind: ProbeKind, options: toml::Value) -> Result<Self, ConfigError> {
        let probe = match kind {
            ProbeKind::Http => Probe::Http(parse_options(kind, options)?),
            ProbeKind::Json => Probe::Json(parse_options(kind, options)?),
            ProbeKind::Query => Probe::Query(parse_options(kind, options)?),
            ProbeKind::Resolve => Probe::Resolve(parse_options(kind, options)?),
            ProbeKind::Ping => Probe::Ping(parse_options(kind, options)?),
        };

        probe.validate().map_err(|reason| ConfigError::invalid(kind, reason))?;
        Ok(probe)
    }

    fn validate(&self) -> anyhow::Result<()> {
        match self {
            Probe::Http(options) => validate_http_target(&options.url),
            Probe::Json(options) => validate_http_target(&options.url),
            Probe::Query(options) => validate_query(&options.connection, &options.query),
            Probe::Resolve(options) => validate_host_name(&options.name),
            Probe::Ping(options) => validate_port(options.port),
        }
    }

    pub fn kind(&self) -> ProbeKind {
        match self {
            Probe::Http(_) => ProbeKind::Http,
            Probe::Json(_) => ProbeKind::Json,
            Probe::Query(_) => ProbeKind::Query,
            Probe::Resolve(_) => ProbeKind::Resolve,
            Probe::Ping(_) => ProbeKind::Ping,
        }
    }

    /// What the probe points at, as reported in its results
    pub fn target(&self) -> String {
        match self {
            Probe::Http(options) => options.url.clone(),
            Probe::Json(options) => options.url.clone(),
            Probe::Query(options) => options.connection.clone(),
            Probe::Resolve(options) => options.name.clone(),
            Probe::Ping(options) => options.ip.to_string(),
        }
    }
}

fn parse_options<T: DeserializeOwned>(kind: ProbeKind, options: toml::Value) -> Result<T, ConfigError> {
    options.try_into::<T>().map_err(|e| ConfigError::invalid(kind, e))
}
