//! REST and live-feed access to the studio backend.
//!
//! ERROR HANDLING
//! ==============
//! Every call returns [`ApiError`]; nothing here falls back silently. The
//! agent roster fallback is a presentation decision left to callers via
//! [`records::default_agents`].
//!
//! Live feeds drop malformed messages and end when the socket closes or
//! fails. They do not reconnect.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use frames::AuthConfig;
use futures::{Stream, StreamExt, future};
use records::{
    AgentInfo, AuthValidation, DeploymentEvent, DeploymentRecord, LogEvent, LogFilter, LogGroup,
    decode_deployment_event, decode_log_event,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::transport::{OutboundSink, Transport, TransportError, WsTransport};
use crate::config::{ConfigError, ws_endpoint};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{what} failed ({status})")]
    Status { what: String, status: u16 },
    #[error(transparent)]
    InvalidBaseUrl(#[from] ConfigError),
    #[error("websocket connect failed: {0}")]
    WsConnect(#[from] TransportError),
    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct GroupsBody {
    #[serde(default)]
    groups: Vec<LogGroup>,
}

#[derive(Deserialize)]
struct EventsBody {
    #[serde(default)]
    events: Vec<LogEvent>,
}

/// HTTP client bound to one backend origin.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] unless `base_url` is http(s).
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_transport(base_url, reqwest::Client::new(), WsTransport)
    }

    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] unless `base_url` is http(s).
    pub fn with_transport<T: Transport>(
        base_url: &str,
        http: reqwest::Client,
        transport: T,
    ) -> Result<Self, ApiError> {
        ws_endpoint(base_url, "")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            transport: Arc::new(transport),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /api/agents`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or bad body.
    pub async fn fetch_agents(&self) -> Result<Vec<AgentInfo>, ApiError> {
        self.get_json("fetch agents", self.endpoint("/api/agents"), &[]).await
    }

    /// `GET /api/deployments`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or bad body.
    pub async fn fetch_deployments(&self) -> Result<Vec<DeploymentRecord>, ApiError> {
        self.get_json("fetch deployments", self.endpoint("/api/deployments"), &[]).await
    }

    /// `GET /api/deployments/{id}/events`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or bad body.
    pub async fn fetch_deployment_events(
        &self,
        deployment_id: &str,
    ) -> Result<Vec<DeploymentEvent>, ApiError> {
        let what = format!("fetch events for deployment {deployment_id}");
        let url = deployment_events_url(&self.base_url, deployment_id)?;
        self.get_json(&what, url, &[]).await
    }

    /// `GET /api/logs/groups[?region=]`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or bad body.
    pub async fn fetch_log_groups(&self, region: Option<&str>) -> Result<Vec<LogGroup>, ApiError> {
        let query: Vec<(&str, String)> = region
            .filter(|r| !r.is_empty())
            .map(|r| vec![("region", r.to_owned())])
            .unwrap_or_default();
        let body: GroupsBody = self
            .get_json("fetch log groups", self.endpoint("/api/logs/groups"), &query)
            .await?;
        Ok(body.groups)
    }

    /// `GET /api/logs/events?group=&start=&end=&keyword=`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure, non-2xx status, or bad body.
    pub async fn fetch_log_events(&self, filter: &LogFilter) -> Result<Vec<LogEvent>, ApiError> {
        let body: EventsBody = self
            .get_json(
                "fetch log events",
                self.endpoint("/api/logs/events"),
                &log_events_query(filter),
            )
            .await?;
        Ok(body.events)
    }

    /// `POST /api/auth/validate` with the given credentials.
    ///
    /// The backend answers `{ ok, message }` even for rejected credentials, so
    /// the body is honoured regardless of status when it parses.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] when the request fails or the body is not a
    /// validation result on a non-2xx status.
    pub async fn validate_auth(&self, config: &AuthConfig) -> Result<AuthValidation, ApiError> {
        let response = self
            .http
            .post(self.endpoint("/api/auth/validate"))
            .json(config)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str::<AuthValidation>(&text) {
            Ok(result) => Ok(result),
            Err(_) if !status.is_success() => Err(ApiError::Status {
                what: "validate credentials".to_owned(),
                status: status.as_u16(),
            }),
            Err(error) => Err(ApiError::Decode(error)),
        }
    }

    /// Tail a log group over `ws(s)://…/ws/logs?group=`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::WsConnect`] when the socket cannot be opened.
    pub async fn subscribe_log_stream(&self, log_group_name: &str) -> Result<Feed<LogEvent>, ApiError> {
        let url = self.log_stream_url(log_group_name)?;
        self.open_feed(&url, decode_log_event).await
    }

    /// Follow live stack events for one deployment.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::WsConnect`] when the socket cannot be opened.
    pub async fn subscribe_deployment_events(
        &self,
        deployment_id: &str,
    ) -> Result<Feed<DeploymentEvent>, ApiError> {
        let url = deployment_feed_url(&self.base_url, deployment_id)?;
        self.open_feed(url.as_str(), decode_deployment_event).await
    }

    fn log_stream_url(&self, log_group_name: &str) -> Result<String, ApiError> {
        let base = ws_endpoint(&self.base_url, "/ws/logs")?;
        let url = reqwest::Url::parse_with_params(&base, &[("group", log_group_name)])
            .map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        Ok(url.into())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        what: &str,
        url: impl reqwest::IntoUrl,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let response = self.http.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                what: what.to_owned(),
                status: status.as_u16(),
            });
        }
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn open_feed<T>(
        &self,
        url: &str,
        decode: fn(&str) -> Result<T, serde_json::Error>,
    ) -> Result<Feed<T>, ApiError>
    where
        T: Send + 'static,
    {
        let connection = self.transport.open(url).await?;
        debug!(%url, "feed opened");
        let items = connection
            .inbound
            .take_while(|item| future::ready(item.is_ok()))
            .filter_map(move |item| {
                future::ready(match item {
                    Ok(text) => match decode(&text) {
                        Ok(value) => Some(value),
                        Err(error) => {
                            debug!(error = %error, "dropping malformed feed message");
                            None
                        }
                    },
                    Err(_) => None,
                })
            });
        Ok(Feed {
            _outbound: connection.outbound,
            items: Box::pin(items),
        })
    }
}

/// Live, decoded messages from one backend socket. Dropping it closes the
/// socket.
pub struct Feed<T> {
    _outbound: OutboundSink,
    items: Pin<Box<dyn Stream<Item = T> + Send>>,
}

impl<T> Stream for Feed<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.items.poll_next_unpin(cx)
    }
}

/// `{base}/api/deployments/{id}/events` with `id` as one encoded segment.
fn deployment_events_url(base_url: &str, deployment_id: &str) -> Result<reqwest::Url, ConfigError> {
    with_segments(base_url, &["api", "deployments", deployment_id, "events"])
}

/// `ws(s)://…/ws/deployments/{id}/events` with `id` as one encoded segment.
fn deployment_feed_url(base_url: &str, deployment_id: &str) -> Result<reqwest::Url, ConfigError> {
    let origin = ws_endpoint(base_url, "")?;
    with_segments(&origin, &["ws", "deployments", deployment_id, "events"])
}

/// Append path segments to `base`, percent-encoding each one so ids cannot
/// add segments, a query or a fragment.
fn with_segments(base: &str, segments: &[&str]) -> Result<reqwest::Url, ConfigError> {
    let invalid = || ConfigError::InvalidBaseUrl(base.to_owned());
    let mut url = reqwest::Url::parse(base).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|()| invalid())?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Query pairs for the log events endpoint. Unset bounds and an empty
/// keyword are omitted; the group is always sent.
fn log_events_query(filter: &LogFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("group", filter.log_group_name.clone())];
    if let Some(start) = filter.start_time {
        query.push(("start", start.to_string()));
    }
    if let Some(end) = filter.end_time {
        query.push(("end", end.to_string()));
    }
    if !filter.keyword.is_empty() {
        query.push(("keyword", filter.keyword.clone()));
    }
    query
}

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;
