use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::datetime;

/// One recorded access to a URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointHit {
    pub app: String,
    pub uri: String,
    pub ip: String,
    #[serde(with = "datetime")]
    pub timestamp: NaiveDateTime,
}

/// Aggregated hit count for one `(app, uri)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewStats {
    pub app: String,
    pub uri: String,
    pub hits: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_timestamp_uses_wire_format() {
        let json = r#"{"app":"afisha","uri":"/events/7","ip":"10.0.0.1","timestamp":"2035-06-01 12:00:00"}"#;
        let hit: EndpointHit = serde_json::from_str(json).unwrap();
        assert_eq!(hit.uri, "/events/7");
        assert!(serde_json::to_string(&hit).unwrap().contains("2035-06-01 12:00:00"));
    }
}
