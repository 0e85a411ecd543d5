//! Station HTTP client
//!
//! The station serves one JSON document at `http://{address}/data`:
//!
//! ```text
//! {"temperature": 21.4, "humidity": 48.0, "pressure": 1012.6, "aqi": 17, "rainfall": 0}
//! ```
//!
//! [`DeviceClient`] is the seam between the polling loop and the network so
//! the loop and the connection tracker can be exercised without a station.
//! [`HttpDeviceClient`] is the real implementation on top of
//! `reqwest::blocking`.

use crate::error::Result;
use crate::types::SensorSample;
use serde_json::{Map, Value};
use std::net::Ipv6Addr;
use std::time::Duration;
use thiserror::Error;

/// Why a single poll failed
///
/// Every variant is retryable. The split between connectivity and payload
/// failures decides whether the initial address cascade moves on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Host unreachable, connection refused, reset, DNS failure...
    #[error("connection error: {0}")]
    Transport(String),

    /// No complete response within the request timeout
    #[error("request timed out")]
    Timeout,

    /// The station answered with a non-2xx status
    #[error("station answered with HTTP {0}")]
    Status(u16),

    /// The body is not a JSON object
    #[error("response is not a JSON object: {0}")]
    MalformedBody(String),

    /// An expected key is absent
    #[error("field not found: {0}")]
    MissingField(&'static str),

    /// An expected key holds a value of the wrong shape
    #[error("invalid value for `{field}`: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Coarse classification of a [`FetchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    /// No usable HTTP response from the address
    Connectivity,
    /// The station answered but the reading is incomplete or mangled
    Payload,
}

impl FetchErrorKind {
    /// Short label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Connectivity => "connectivity",
            FetchErrorKind::Payload => "payload",
        }
    }
}

impl FetchError {
    /// Classify this error
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Transport(_)
            | FetchError::Timeout
            | FetchError::Status(_)
            | FetchError::MalformedBody(_) => FetchErrorKind::Connectivity,
            FetchError::MissingField(_) | FetchError::InvalidField { .. } => {
                FetchErrorKind::Payload
            }
        }
    }

    /// Whether this failure means the address itself is not serving a station
    #[inline]
    pub fn is_connection_level(&self) -> bool {
        self.kind() == FetchErrorKind::Connectivity
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

/// Source of station readings
#[cfg_attr(test, mockall::automock)]
pub trait DeviceClient: Send {
    /// Fetch one reading from the station at `address` (`host` or `host:port`)
    fn fetch(&self, address: &str) -> std::result::Result<SensorSample, FetchError>;
}

/// [`DeviceClient`] that performs `GET http://{address}{endpoint_path}`
#[derive(Debug, Clone)]
pub struct HttpDeviceClient {
    client: reqwest::blocking::Client,
    endpoint_path: String,
}

impl HttpDeviceClient {
    /// Create a client whose requests give up after `timeout`
    pub fn new(endpoint_path: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint_path: endpoint_path.into(),
        })
    }

    /// URL polled for a given address
    ///
    /// A bare IPv6 literal is wrapped in brackets so it is not read as host and port.
    pub fn url_for(&self, address: &str) -> String {
        match address.parse::<Ipv6Addr>() {
            Ok(ip) => format!("http://[{}]{}", ip, self.endpoint_path),
            Err(_) => format!("http://{}{}", address, self.endpoint_path),
        }
    }
}

impl DeviceClient for HttpDeviceClient {
    fn fetch(&self, address: &str) -> std::result::Result<SensorSample, FetchError> {
        let url = self.url_for(address);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.text().map_err(FetchError::from_reqwest)?;
        decode_payload(&body)
    }
}

/// Decode a station response body into a sample
///
/// `aqi` must be integral. `rainfall` may be `0`/`1` or a JSON boolean.
pub fn decode_payload(body: &str) -> std::result::Result<SensorSample, FetchError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedBody(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| FetchError::MalformedBody(format!("expected an object, got {}", value)))?;

    Ok(SensorSample {
        temperature: number_field(object, "temperature")?,
        humidity: number_field(object, "humidity")?,
        pressure: number_field(object, "pressure")?,
        air_quality_index: integer_field(object, "aqi")?,
        rain_detected: flag_field(object, "rainfall")?,
    })
}

fn field<'a>(
    object: &'a Map<String, Value>,
    name: &'static str,
) -> std::result::Result<&'a Value, FetchError> {
    object.get(name).ok_or(FetchError::MissingField(name))
}

fn invalid(name: &'static str, expected: &str, got: &Value) -> FetchError {
    FetchError::InvalidField {
        field: name,
        reason: format!("expected {}, got {}", expected, got),
    }
}

fn number_field(
    object: &Map<String, Value>,
    name: &'static str,
) -> std::result::Result<f64, FetchError> {
    let value = field(object, name)?;
    value.as_f64().ok_or_else(|| invalid(name, "a number", value))
}

fn integer_field(
    object: &Map<String, Value>,
    name: &'static str,
) -> std::result::Result<i64, FetchError> {
    let value = field(object, name)?;
    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        })
        .ok_or_else(|| invalid(name, "an integer", value))
}

fn flag_field(
    object: &Map<String, Value>,
    name: &'static str,
) -> std::result::Result<bool, FetchError> {
    let value = field(object, name)?;
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(invalid(name, "0 or 1", value)),
        },
        _ => Err(invalid(name, "0 or 1", value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_payload() {
        let sample = decode_payload(
            r#"{"temperature": 21.4, "humidity": 48, "pressure": 1012.6, "aqi": 17, "rainfall": 1}"#,
        )
        .unwrap();

        assert_eq!(sample, SensorSample::new(21.4, 48.0, 1012.6, 17, true));
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let sample = decode_payload(
            r#"{"temperature": 1, "humidity": 2, "pressure": 3, "aqi": 4.0, "rainfall": false, "uptime": 99}"#,
        )
        .unwrap();
        assert_eq!(sample.air_quality_index, 4);
        assert!(!sample.rain_detected);
    }

    #[test]
    fn test_missing_field_is_payload_error() {
        let err = decode_payload(r#"{"temperature": 1, "humidity": 2, "pressure": 3, "rainfall": 0}"#)
            .unwrap_err();
        assert_eq!(err, FetchError::MissingField("aqi"));
        assert_eq!(err.kind(), FetchErrorKind::Payload);
        assert!(!err.is_connection_level());
        assert_eq!(err.to_string(), "field not found: aqi");
    }

    #[test]
    fn test_wrong_type_is_payload_error() {
        let err = decode_payload(
            r#"{"temperature": "warm", "humidity": 2, "pressure": 3, "aqi": 4, "rainfall": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::InvalidField { field: "temperature", .. }));
        assert!(!err.is_connection_level());

        let err = decode_payload(
            r#"{"temperature": 1, "humidity": 2, "pressure": 3, "aqi": 4.5, "rainfall": 0}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::InvalidField { field: "aqi", .. }));

        let err = decode_payload(
            r#"{"temperature": 1, "humidity": 2, "pressure": 3, "aqi": 4, "rainfall": 7}"#,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::InvalidField { field: "rainfall", .. }));
    }

    #[test]
    fn test_malformed_body_is_connectivity_error() {
        let err = decode_payload("<html>captive portal</html>").unwrap_err();
        assert!(matches!(err, FetchError::MalformedBody(_)));
        assert!(err.is_connection_level());

        let err = decode_payload("[1, 2, 3]").unwrap_err();
        assert!(matches!(err, FetchError::MalformedBody(_)));
    }

    #[test]
    fn test_error_classification() {
        assert!(FetchError::Timeout.is_connection_level());
        assert!(FetchError::Status(503).is_connection_level());
        assert!(FetchError::Transport("refused".into()).is_connection_level());
        assert_eq!(FetchErrorKind::Payload.as_str(), "payload");
    }

    #[test]
    fn test_url_for_address() {
        let client = HttpDeviceClient::new("/data", Duration::from_millis(2500)).unwrap();
        assert_eq!(client.url_for("172.16.49.253"), "http://172.16.49.253/data");
        assert_eq!(client.url_for("station.local:8080"), "http://station.local:8080/data");
    }

    #[test]
    fn test_url_for_ipv6_address() {
        let client = HttpDeviceClient::new("/data", Duration::from_millis(2500)).unwrap();

        let bare = client.url_for("fe80::1");
        assert_eq!(bare, "http://[fe80::1]/data");
        assert!(reqwest::Url::parse(&bare).is_ok());

        let with_port = client.url_for("[fe80::1]:8080");
        assert_eq!(with_port, "http://[fe80::1]:8080/data");
        assert!(reqwest::Url::parse(&with_port).is_ok());
    }

    #[test]
    fn test_unreachable_address_is_connectivity_error() {
        // Port 9 on localhost is almost never listening; either refusal or timeout is fine.
        let client = HttpDeviceClient::new("/data", Duration::from_millis(300)).unwrap();
        let err = client.fetch("127.0.0.1:9").unwrap_err();
        assert!(err.is_connection_level(), "unexpected error: {err}");
    }
}
