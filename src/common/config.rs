//! Endpoint configuration
//!
//! Two on-disk formats are accepted: the `key=value` properties file the
//! application has always shipped with, and a TOML file for the platform
//! config directory. Both end up in the same validated [`EndpointConfig`].

use serde::Deserialize;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use super::{Error, Result};

// Property keys
pub const REMOTE_HOST_KEY: &str = "GIFT_XML_RPC_SERVER_IP_ADDRESS";
pub const REMOTE_PORT_KEY: &str = "GIFT_XML_RPC_SERVER_PORT";
pub const LISTEN_PORT_KEY: &str = "MY_XML_RPC_SERVER_PORT";
pub const TEST_MODE_KEY: &str = "USING_GIFT_XML_RPC_SERVER_TEST";
pub const REQUEST_TIMEOUT_KEY: &str = "REQUEST_TIMEOUT_SECS";

const COMMENT_PREFIX: char = '#';
const PROPERTY_DELIM: char = '=';

fn default_request_secs() -> u64 {
    10
}

/// Validated endpoint configuration, loaded once and shared read-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Host (IP address or name) of the platform's XML-RPC server
    pub remote_host: String,
    /// Port of the platform's XML-RPC server
    pub remote_port: u16,
    /// Local port our listener binds
    pub listen_port: u16,
    /// Route outbound calls to the platform's echo test handler
    pub test_mode: bool,
    /// Timeout applied to every outbound call
    pub request_timeout: Duration,
}

impl EndpointConfig {
    /// Load configuration from a file, picking the format by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));

        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_properties(&content, &path.display().to_string())
        }
    }

    /// Parse the properties format
    ///
    /// `source` names the file in error messages.
    pub fn from_properties(content: &str, source: &str) -> Result<Self> {
        let properties = Properties::parse(content);
        for line in &properties.skipped {
            tracing::warn!(
                file = source,
                line = *line,
                "Skipping malformed property line (expected name=value)"
            );
        }

        let require = |key: &str| {
            properties.get(key).ok_or_else(|| Error::ConfigMissingKey {
                key: key.to_string(),
                path: source.to_string(),
            })
        };

        let remote_host = validate_host(REMOTE_HOST_KEY, require(REMOTE_HOST_KEY)?)?;
        let remote_port = parse_port(REMOTE_PORT_KEY, require(REMOTE_PORT_KEY)?)?;
        let listen_port = parse_port(LISTEN_PORT_KEY, require(LISTEN_PORT_KEY)?)?;

        // Anything other than the literal "true" leaves test mode off
        let test_mode = properties.get(TEST_MODE_KEY) == Some("true");

        let request_secs = match properties.get(REQUEST_TIMEOUT_KEY) {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| Error::config_invalid(REQUEST_TIMEOUT_KEY, raw, e))?,
            None => default_request_secs(),
        };

        Ok(Self {
            remote_host,
            remote_port,
            listen_port,
            test_mode,
            request_timeout: request_timeout(REQUEST_TIMEOUT_KEY, request_secs)?,
        })
    }

    /// Parse the TOML format
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: FileConfig =
            toml::from_str(content).map_err(|e| Error::ConfigParse(e.to_string()))?;

        let remote_host = validate_host("remote.host", &file.remote.host)?;
        let remote_port = port_from_int("remote.port", file.remote.port)?;
        let listen_port = port_from_int("listen.port", file.listen.port)?;

        Ok(Self {
            remote_host,
            remote_port,
            listen_port,
            test_mode: file.test_mode,
            request_timeout: request_timeout("timeouts.request_secs", file.timeouts.request_secs)?,
        })
    }

    /// URL of the platform's XML-RPC endpoint
    pub fn remote_url(&self) -> String {
        match self.remote_host.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("http://[{}]:{}/", ip, self.remote_port),
            _ => format!("http://{}:{}/", self.remote_host, self.remote_port),
        }
    }
}

/// Raw `name=value` pairs plus the line numbers that were skipped
#[derive(Debug, Default)]
pub struct Properties {
    values: HashMap<String, String>,
    /// 1-based numbers of lines without a delimiter
    pub skipped: Vec<usize>,
}

impl Properties {
    /// Parse properties leniently: comments, blank lines and lines without
    /// `=` are skipped. The first `=` splits name from value.
    pub fn parse(content: &str) -> Self {
        let mut props = Self::default();

        for (idx, row) in content.lines().enumerate() {
            if row.starts_with(COMMENT_PREFIX) || row.trim().is_empty() {
                continue;
            }

            let Some((name, value)) = row.split_once(PROPERTY_DELIM) else {
                props.skipped.push(idx + 1);
                continue;
            };

            let name = name.trim().to_string();
            if props.values.contains_key(&name) {
                tracing::warn!(key = %name, line = idx + 1, "Duplicate property, using later value");
            }
            props.values.insert(name, value.trim().to_string());
        }

        props
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.values.len()
    }
}

/// TOML file layout
#[derive(Debug, Deserialize)]
struct FileConfig {
    remote: RemoteSection,
    listen: ListenSection,
    #[serde(default)]
    test_mode: bool,
    #[serde(default)]
    timeouts: Timeouts,
}

#[derive(Debug, Deserialize)]
struct RemoteSection {
    host: String,
    port: i64,
}

#[derive(Debug, Deserialize)]
struct ListenSection {
    port: i64,
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
struct Timeouts {
    #[serde(default = "default_request_secs")]
    request_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: default_request_secs(),
        }
    }
}

fn parse_port(key: &str, raw: &str) -> Result<u16> {
    let value: i64 = raw
        .parse()
        .map_err(|e| Error::config_invalid(key, raw, e))?;
    port_from_int(key, value)
}

fn port_from_int(key: &str, value: i64) -> Result<u16> {
    match u16::try_from(value) {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(Error::config_invalid(
            key,
            &value.to_string(),
            "port must be in 1..=65535",
        )),
    }
}

fn request_timeout(key: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(Error::config_invalid(
            key,
            "0",
            "timeout must be at least one second",
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn validate_host(key: &str, raw: &str) -> Result<String> {
    if raw.parse::<IpAddr>().is_ok() || is_hostname(raw) {
        Ok(raw.to_string())
    } else {
        Err(Error::config_invalid(
            key,
            raw,
            "expected an IP address or host name",
        ))
    }
}

fn is_hostname(s: &str) -> bool {
    if s.is_empty() || s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
