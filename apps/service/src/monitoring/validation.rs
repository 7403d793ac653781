//! Construction-time validation of probe options.
//!
//! Everything here runs before the first cycle so that a bad configuration
//! stops the process instead of producing a stream of failed results.

use anyhow::{Result, anyhow, bail};
use url::Url;

/// Validate an HTTP/HTTPS probe target
pub fn validate_http_target(target: &str) -> Result<()> {
    let url = Url::parse(target).map_err(|e| anyhow!("invalid URL {target}: {e}"))?;

    match url.scheme() {
        "http" | "https" => {}
        other => bail!("invalid scheme for HTTP probe: {other}"),
    }

    if url.host_str().is_none_or(str::is_empty) {
        bail!("URL {target} has no host");
    }

    if let Some(port) = url.port() {
        validate_port(port)?;
    }

    Ok(())
}

/// Validate a host name handed to the resolver
pub fn validate_host_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 253 {
        bail!("invalid host name length: {}", name.len());
    }

    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };

    if !name.trim_end_matches('.').split('.').all(valid_label) {
        bail!("invalid host name: {name}");
    }

    Ok(())
}

/// Validate a query probe's connection string and statement
pub fn validate_query(connection: &str, query: &str) -> Result<()> {
    if connection.trim().is_empty() {
        bail!("connection must not be empty");
    }
    if query.trim().is_empty() {
        bail!("query must not be empty");
    }
    Ok(())
}

/// Validate port is in valid range
pub fn validate_port(port: u16) -> Result<()> {
    if port == 0 {
        bail!("Port 0 is not valid");
    }
    Ok(())
}

/// Validate timeout is reasonable
pub fn validate_timeout(timeout_seconds: u64) -> Result<()> {
    const MIN_TIMEOUT: u64 = 1;
    const MAX_TIMEOUT: u64 = 300; // 5 minutes

    if timeout_seconds < MIN_TIMEOUT {
        return Err(anyhow!(
            "Timeout too short: {} seconds (minimum: {})",
            timeout_seconds,
            MIN_TIMEOUT
        ));
    }

    if timeout_seconds > MAX_TIMEOUT {
        return Err(anyhow!(
            "Timeout too long: {} seconds (maximum: {})",
            timeout_seconds,
            MAX_TIMEOUT
        ));
    }

    Ok(())
}
