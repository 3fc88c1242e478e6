//! Object-store addressing.
//!
//! A node's location is stored as `minio://<scheme>://<host>/<bucket>/<object path>`. The
//! bucket and object path are recovered from the text after the last `//`, split into host,
//! bucket and the remaining path.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket plus object path; also the lock key of a file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub bucket: String,
    pub path: String,
}

impl ObjectKey {
    pub fn new(bucket: impl Into<String>, path: impl Into<String>) -> Self {
        ObjectKey {
            bucket: bucket.into(),
            path: path.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.path)
    }
}

const SCHEME: &str = "minio://";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Location {
    /// Endpoint including its own scheme, e.g. `http://minio.local:9000`.
    pub endpoint: String,
    pub key: ObjectKey,
}

impl Location {
    pub fn new(endpoint: impl Into<String>, key: ObjectKey) -> Self {
        Location {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            key,
        }
    }

    pub fn parse(uri: &str) -> Result<Self, String> {
        let rest = uri
            .strip_prefix(SCHEME)
            .ok_or_else(|| format!("location '{uri}' does not start with {SCHEME}"))?;
        let (endpoint_scheme, tail) = match rest.rfind("//") {
            Some(idx) => (&rest[..idx + 2], &rest[idx + 2..]),
            None => ("", rest),
        };
        let mut parts = tail.splitn(3, '/');
        let host = parts.next().unwrap_or_default();
        let bucket = parts.next().unwrap_or_default();
        let path = parts.next().unwrap_or_default();
        if host.is_empty() || bucket.is_empty() || path.is_empty() {
            return Err(format!(
                "location '{uri}' must look like {SCHEME}<endpoint>/<bucket>/<path>"
            ));
        }
        Ok(Location {
            endpoint: format!("{endpoint_scheme}{host}"),
            key: ObjectKey::new(bucket, path),
        })
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME}{}/{}", self.endpoint, self.key)
    }
}

impl TryFrom<String> for Location {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Location::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.to_string()
    }
}
