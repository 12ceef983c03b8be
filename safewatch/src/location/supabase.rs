//! Supabase sink - stores accepted updates through a PostgREST RPC call.
//!
//! Calls `POST {url}/rest/v1/rpc/{function}` with the project API key and the
//! signed-in user's access token. Without a session every record is answered
//! with [`PersistenceError::AuthRequired`] so the outbox skips it quietly.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::StatusCode;
use serde::Serialize;

use super::sink::{LocationRecord, PersistenceError, PersistenceSink};

/// Default RPC function that stores a user location.
pub const DEFAULT_RPC_FUNCTION: &str = "record_user_location";

/// Default HTTP timeout for persistence calls.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body excerpt kept in error messages.
const MAX_ERROR_BODY: usize = 200;

/// Connection settings for the Supabase project.
#[derive(Debug, Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub url: String,

    /// Public (anon) API key.
    pub api_key: String,

    /// RPC function name.
    pub rpc_function: String,

    pub request_timeout: Duration,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            rpc_function: DEFAULT_RPC_FUNCTION.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Full RPC endpoint URL.
    pub fn rpc_url(&self) -> String {
        format!(
            "{}/rest/v1/rpc/{}",
            self.url.trim_end_matches('/'),
            self.rpc_function
        )
    }
}

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupabaseSession {
    pub user_id: String,
    pub access_token: String,
}

/// RPC arguments, named as the database function expects them.
#[derive(Debug, Serialize)]
struct RecordLocationArgs<'a> {
    p_user_id: &'a str,
    p_latitude: f64,
    p_longitude: f64,
    p_accuracy: f64,
    p_source: &'a str,
}

/// Persistence sink backed by a Supabase project.
pub struct SupabaseSink {
    config: SupabaseConfig,
    http: reqwest::Client,
    session: RwLock<Option<SupabaseSession>>,
}

impl SupabaseSink {
    /// Create a sink with no session.
    pub fn new(config: SupabaseConfig) -> Result<Self, PersistenceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PersistenceError::Remote(format!("HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http,
            session: RwLock::new(None),
        })
    }

    /// Install or clear the signed-in user.
    pub fn set_session(&self, session: Option<SupabaseSession>) {
        *self.session.write() = session;
    }

    pub fn has_session(&self) -> bool {
        self.session.read().is_some()
    }
}

impl PersistenceSink for SupabaseSink {
    async fn record_location(&self, record: LocationRecord) -> Result<(), PersistenceError> {
        let session = self.session.read().clone();
        let Some(session) = session else {
            return Err(PersistenceError::AuthRequired);
        };

        let args = RecordLocationArgs {
            p_user_id: &session.user_id,
            p_latitude: record.coordinate.latitude(),
            p_longitude: record.coordinate.longitude(),
            p_accuracy: record.accuracy_meters,
            p_source: record.source,
        };

        let response = self
            .http
            .post(self.config.rpc_url())
            .header("apikey", &self.config.api_key)
            .bearer_auth(&session.access_token)
            .json(&args)
            .send()
            .await
            .map_err(|e| PersistenceError::Remote(e.to_string()))?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        tracing::trace!(status = status.as_u16(), "Supabase RPC completed");
        classify_response(status, &body)
    }
}

/// Map an RPC response to the sink result.
fn classify_response(status: StatusCode, body: &str) -> Result<(), PersistenceError> {
    if status.is_success() {
        return Ok(());
    }
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PersistenceError::AuthRequired);
    }

    let excerpt: String = body.chars().take(MAX_ERROR_BODY).collect();
    Err(PersistenceError::Remote(format!(
        "HTTP {}: {}",
        status.as_u16(),
        excerpt
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Coordinate;

    fn sink() -> SupabaseSink {
        SupabaseSink::new(SupabaseConfig::new("https://example.supabase.co/", "anon")).unwrap()
    }

    #[test]
    fn test_rpc_url() {
        let config = SupabaseConfig::new("https://example.supabase.co/", "anon");
        assert_eq!(
            config.rpc_url(),
            "https://example.supabase.co/rest/v1/rpc/record_user_location"
        );
    }

    #[test]
    fn test_args_serialize_with_rpc_names() {
        let args = RecordLocationArgs {
            p_user_id: "user-1",
            p_latitude: 30.0444,
            p_longitude: 31.2357,
            p_accuracy: 12.5,
            p_source: "gps",
        };
        let json = serde_json::to_value(&args).unwrap();
        assert_eq!(json["p_user_id"], "user-1");
        assert_eq!(json["p_latitude"], 30.0444);
        assert_eq!(json["p_source"], "gps");
    }

    #[test]
    fn test_classify_response() {
        assert_eq!(classify_response(StatusCode::OK, ""), Ok(()));
        assert_eq!(classify_response(StatusCode::NO_CONTENT, ""), Ok(()));
        assert_eq!(
            classify_response(StatusCode::UNAUTHORIZED, "jwt expired"),
            Err(PersistenceError::AuthRequired)
        );
        assert_eq!(
            classify_response(StatusCode::FORBIDDEN, ""),
            Err(PersistenceError::AuthRequired)
        );
        assert_eq!(
            classify_response(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            Err(PersistenceError::Remote("HTTP 500: boom".to_string()))
        );
    }

    #[test]
    fn test_error_body_is_truncated() {
        let body = "x".repeat(1000);
        match classify_response(StatusCode::BAD_REQUEST, &body) {
            Err(PersistenceError::Remote(msg)) => assert!(msg.len() < 220),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_session_requires_auth() {
        let sink = sink();
        assert!(!sink.has_session());

        let record = LocationRecord::gps(Coordinate::new(1.0, 1.0).unwrap(), 5.0, 0);
        assert_eq!(
            sink.record_location(record).await,
            Err(PersistenceError::AuthRequired)
        );
    }

    #[test]
    fn test_session_can_be_set_and_cleared() {
        let sink = sink();
        sink.set_session(Some(SupabaseSession {
            user_id: "u".into(),
            access_token: "t".into(),
        }));
        assert!(sink.has_session());

        sink.set_session(None);
        assert!(!sink.has_session());
    }
}
