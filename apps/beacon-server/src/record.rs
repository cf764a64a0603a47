//! Event record assembled for every beacon hit.

use std::collections::BTreeMap;
use std::net::IpAddr;

use beacon_enrichment::NetworkInfo;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Tag appended to every partition key.
const PARTITION_KEY_SUFFIX: &str = "::beacon";

/// Upper bound (inclusive) of the random partition key prefix.
const PARTITION_KEY_RANGE: u32 = 1_000_000;

/// Metadata captured from one beacon request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Value of the account query parameter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Remote peer address.
    pub ip_address: String,
    /// Capture time in epoch milliseconds.
    pub timestamp: i64,
    /// Request headers; the first value wins for repeated names.
    pub headers: BTreeMap<String, String>,
    /// Network-registry enrichment, when the lookup succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkInfo>,
}

impl EventRecord {
    /// Capture a record from request parts.
    #[must_use]
    pub fn capture(
        parts: &http::request::Parts,
        remote_ip: IpAddr,
        account_param: &str,
        now: DateTime<Utc>,
    ) -> Self {
        let account_id = parts.uri.query().and_then(|query| {
            form_urlencoded::parse(query.as_bytes())
                .find(|(name, _)| name == account_param)
                .map(|(_, value)| value.into_owned())
        });

        let mut headers = BTreeMap::new();
        for (name, value) in &parts.headers {
            headers
                .entry(name.as_str().to_owned())
                .or_insert_with(|| String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Self {
            account_id,
            ip_address: remote_ip.to_canonical().to_string(),
            timestamp: now.timestamp_millis(),
            headers,
            network: None,
        }
    }

    /// Serialize to the UTF-8 JSON bytes that are published.
    ///
    /// # Errors
    /// Returns a [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// A fresh partition key: a random integer followed by `::beacon`.
///
/// Keys are not unique; Kinesis only uses them to spread records over shards.
#[must_use]
pub fn new_partition_key() -> String {
    let prefix = rand::random_range(0..=PARTITION_KEY_RANGE);
    format!("{prefix}{PARTITION_KEY_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use chrono::TimeZone;

    use super::*;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> http::request::Parts {
        let mut builder = http::Request::builder().method("GET").uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn noon_2024() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_should_capture_account_ip_timestamp_and_headers() {
        let parts = parts(
            "/font.css?charset=acme-42&v=3",
            &[("User-Agent", "Mozilla/5.0"), ("Referer", "https://example.com/")],
        );
        let record = EventRecord::capture(
            &parts,
            IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7)),
            "charset",
            noon_2024(),
        );

        assert_eq!(record.account_id.as_deref(), Some("acme-42"));
        assert_eq!(record.ip_address, "203.0.113.7");
        assert_eq!(record.timestamp, 1_704_110_400_000);
        assert_eq!(record.headers["user-agent"], "Mozilla/5.0");
        assert_eq!(record.headers["referer"], "https://example.com/");
        assert!(record.network.is_none());
    }

    #[test]
    fn test_should_decode_account_parameter_and_honor_custom_name() {
        let parts = parts("/?acct=a%20b&charset=ignored", &[]);
        let record = EventRecord::capture(&parts, IpAddr::V4(Ipv4Addr::LOCALHOST), "acct", noon_2024());
        assert_eq!(record.account_id.as_deref(), Some("a b"));
    }

    #[test]
    fn test_should_keep_first_value_of_repeated_header() {
        let parts = parts("/", &[("Accept", "text/css"), ("Accept", "*/*")]);
        let record = EventRecord::capture(&parts, IpAddr::V4(Ipv4Addr::LOCALHOST), "charset", noon_2024());
        assert_eq!(record.headers["accept"], "text/css");
    }

    #[test]
    fn test_should_unmap_ipv4_mapped_ipv6_peer() {
        let mapped = IpAddr::V6(Ipv4Addr::new(198, 51, 100, 1).to_ipv6_mapped());
        let record = EventRecord::capture(&parts("/", &[]), mapped, "charset", noon_2024());
        assert_eq!(record.ip_address, "198.51.100.1");

        let v6 = IpAddr::V6(Ipv6Addr::LOCALHOST);
        let record = EventRecord::capture(&parts("/", &[]), v6, "charset", noon_2024());
        assert_eq!(record.ip_address, "::1");
    }

    #[test]
    fn test_should_omit_absent_optional_fields_in_json() {
        let record = EventRecord::capture(&parts("/", &[]), IpAddr::V4(Ipv4Addr::LOCALHOST), "charset", noon_2024());
        let json: serde_json::Value = serde_json::from_slice(&record.to_json().unwrap()).unwrap();
        assert!(json.get("accountId").is_none());
        assert!(json.get("network").is_none());
        assert_eq!(json["ipAddress"], "127.0.0.1");
        assert_eq!(json["timestamp"], 1_704_110_400_000_i64);
    }

    #[test]
    fn test_should_serialize_network_object() {
        let mut record = EventRecord::capture(&parts("/", &[]), IpAddr::V4(Ipv4Addr::LOCALHOST), "charset", noon_2024());
        record.network = Some(NetworkInfo {
            name: "EXAMPLE-NET".to_owned(),
            description: Some("Example Ltd".to_owned()),
        });
        let json: serde_json::Value = serde_json::from_slice(&record.to_json().unwrap()).unwrap();
        assert_eq!(json["network"]["name"], "EXAMPLE-NET");
        assert_eq!(json["network"]["description"], "Example Ltd");
    }

    #[test]
    fn test_should_generate_tagged_partition_key() {
        for _ in 0..100 {
            let key = new_partition_key();
            let prefix = key.strip_suffix("::beacon").unwrap();
            assert!(prefix.parse::<u32>().unwrap() <= 1_000_000);
        }
    }
}
