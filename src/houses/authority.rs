// 🏰 House Authority - the external service that decides whether a house exists

use super::HouseRecord;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of a single lookup against the authority
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    /// First record of the authority's answer
    Found(HouseRecord),
    /// Empty or unrecognisable answer
    NotFound,
    /// Transport error, timeout, non-success status or undecodable body
    Failed(String),
}

#[async_trait]
pub trait HouseAuthority: Send + Sync {
    /// One lookup, no retries. Never panics, never errors: failures are `Failed`.
    async fn lookup(&self, house_id: &str) -> LookupOutcome;
}

/// Reduce an authority response body to an outcome.
///
/// The body must be a non-empty array whose first element is an object.
/// Anything else (empty array, `{"error": ...}`, scalars) means not found.
pub fn normalize_response(body: Value) -> LookupOutcome {
    match body {
        Value::Array(items) => match items.into_iter().next() {
            Some(first @ Value::Object(_)) => LookupOutcome::Found(first),
            _ => LookupOutcome::NotFound,
        },
        _ => LookupOutcome::NotFound,
    }
}

// ============================================================================
// POTTER API CLIENT
// ============================================================================

/// HTTP client for `GET {base}/houses/{id}?key={credential}`
pub struct PotterApiAuthority {
    base_url: Url,
    api_key: String,
    http_client: reqwest::Client,
}

impl PotterApiAuthority {
    /// Every request is bounded by `timeout`; the connect phase by at most 5s.
    pub fn new(base_url: &str, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid house API URL: {}", base_url))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("House API URL cannot be a base: {}", base_url));
        }

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()
            .context("Failed to build house API client")?;

        Ok(PotterApiAuthority {
            base_url,
            api_key: api_key.into(),
            http_client,
        })
    }

    fn house_url(&self, house_id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow!("House API URL cannot be a base: {}", self.base_url))?
            .pop_if_empty()
            .push("houses")
            .push(house_id);
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl HouseAuthority for PotterApiAuthority {
    async fn lookup(&self, house_id: &str) -> LookupOutcome {
        let url = match self.house_url(house_id) {
            Ok(url) => url,
            Err(e) => return LookupOutcome::Failed(e.to_string()),
        };

        let response = match self.http_client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return LookupOutcome::Failed(format!("request failed: {}", e)),
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return LookupOutcome::NotFound;
        }
        if !status.is_success() {
            return LookupOutcome::Failed(format!("authority responded with {}", status));
        }

        match response.json::<Value>().await {
            Ok(body) => normalize_response(body),
            Err(e) => LookupOutcome::Failed(format!("undecodable response: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::StatusCode as AxumStatus;
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    const KNOWN_HOUSE: &str = "5a05e2b252f721a3cf2ea33f";

    /// Spawn a stand-in authority on an ephemeral port and return its base URL
    async fn spawn_fake_authority() -> String {
        async fn house(
            Path(id): Path<String>,
            Query(query): Query<HashMap<String, String>>,
        ) -> impl IntoResponse {
            if query.get("key").map(String::as_str) != Some("test-key") {
                return (AxumStatus::UNAUTHORIZED, Json(json!({"error": "API key not found"})))
                    .into_response();
            }
            match id.as_str() {
                KNOWN_HOUSE => Json(json!([{"_id": KNOWN_HOUSE, "name": "Gryffindor"}]))
                    .into_response(),
                "broken" => (AxumStatus::INTERNAL_SERVER_ERROR, "boom").into_response(),
                "garbled" => "not json".into_response(),
                "slow" => {
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Json(json!([{"name": "Late"}])).into_response()
                }
                _ => Json(json!([])).into_response(),
            }
        }

        let app = Router::new().route("/v1/houses/:id", get(house));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/v1", addr)
    }

    #[test]
    fn test_normalize_takes_first_object() {
        let body = json!([{"name": "Gryffindor"}, {"name": "Slytherin"}]);
        assert_eq!(
            normalize_response(body),
            LookupOutcome::Found(json!({"name": "Gryffindor"}))
        );
    }

    #[test]
    fn test_normalize_rejects_empty_and_unstructured() {
        assert_eq!(normalize_response(json!([])), LookupOutcome::NotFound);
        assert_eq!(normalize_response(json!(["Gryffindor"])), LookupOutcome::NotFound);
        assert_eq!(normalize_response(json!([null])), LookupOutcome::NotFound);
        assert_eq!(
            normalize_response(json!({"error": "Must be a valid ID"})),
            LookupOutcome::NotFound
        );
        assert_eq!(normalize_response(json!("house")), LookupOutcome::NotFound);
    }

    #[test]
    fn test_house_url_shape() {
        let authority =
            PotterApiAuthority::new("https://www.potterapi.com/v1/", "k3y", Duration::from_secs(1))
                .unwrap();

        let url = authority.house_url("abc 123").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.potterapi.com/v1/houses/abc%20123?key=k3y"
        );
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(PotterApiAuthority::new("not a url", "", Duration::from_secs(1)).is_err());
        assert!(PotterApiAuthority::new("mailto:house@example.com", "", Duration::from_secs(1)).is_err());
    }

    #[tokio::test]
    async fn test_lookup_found_and_not_found() {
        let base = spawn_fake_authority().await;
        let authority = PotterApiAuthority::new(&base, "test-key", Duration::from_secs(2)).unwrap();

        assert_eq!(
            authority.lookup(KNOWN_HOUSE).await,
            LookupOutcome::Found(json!({"_id": KNOWN_HOUSE, "name": "Gryffindor"}))
        );
        assert_eq!(
            authority.lookup("someinvalidhousegoeshere").await,
            LookupOutcome::NotFound
        );
    }

    #[tokio::test]
    async fn test_lookup_failures_are_tagged() {
        let base = spawn_fake_authority().await;
        let authority = PotterApiAuthority::new(&base, "test-key", Duration::from_secs(2)).unwrap();

        assert!(matches!(authority.lookup("broken").await, LookupOutcome::Failed(_)));
        assert!(matches!(authority.lookup("garbled").await, LookupOutcome::Failed(_)));

        let wrong_key = PotterApiAuthority::new(&base, "nope", Duration::from_secs(2)).unwrap();
        assert!(matches!(wrong_key.lookup(KNOWN_HOUSE).await, LookupOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_lookup_times_out() {
        let base = spawn_fake_authority().await;
        let authority =
            PotterApiAuthority::new(&base, "test-key", Duration::from_millis(200)).unwrap();

        assert!(matches!(authority.lookup("slow").await, LookupOutcome::Failed(_)));
    }

    #[tokio::test]
    async fn test_lookup_unreachable_authority() {
        // Bind then drop to get a port nobody is listening on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let authority = PotterApiAuthority::new(
            &format!("http://{}/v1", addr),
            "test-key",
            Duration::from_secs(1),
        )
        .unwrap();

        assert!(matches!(authority.lookup(KNOWN_HOUSE).await, LookupOutcome::Failed(_)));
    }
}
