use futures::StreamExt;
use tokio::sync::mpsc;

use super::*;
use crate::net::scripted::{OpenAttempt, Outcome, ScriptedTransport};

fn scripted_client(
    base_url: &str,
) -> (ApiClient, ScriptedTransport, mpsc::UnboundedReceiver<OpenAttempt>) {
    let (transport, opens) = ScriptedTransport::new();
    let client = ApiClient::with_transport(base_url, reqwest::Client::new(), transport.clone())
        .expect("valid base url");
    (client, transport, opens)
}

#[test]
fn new_rejects_non_http_base() {
    let err = ApiClient::new("studio.local:8000").err().expect("should fail");
    assert!(matches!(err, ApiError::InvalidBaseUrl(ConfigError::InvalidBaseUrl(_))));
}

#[test]
fn base_url_drops_trailing_slash() {
    let client = ApiClient::new("http://localhost:8000/").expect("valid");
    assert_eq!(client.base_url(), "http://localhost:8000");
    assert_eq!(client.endpoint("/api/agents"), "http://localhost:8000/api/agents");
}

#[test]
fn deployment_events_url_embeds_id() {
    let url = deployment_events_url("http://localhost:8000", "d-42").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8000/api/deployments/d-42/events");
}

#[test]
fn deployment_id_stays_one_path_segment() {
    let url = deployment_events_url("http://localhost:8000", "d/1?x#y").expect("url");
    assert_eq!(
        url.as_str(),
        "http://localhost:8000/api/deployments/d%2F1%3Fx%23y/events"
    );
    assert_eq!(url.query(), None);
    assert_eq!(url.fragment(), None);
}

#[test]
fn deployment_urls_keep_base_path_prefix() {
    let url = deployment_events_url("https://studio.example.com/hivemind", "d-1").expect("url");
    assert_eq!(
        url.as_str(),
        "https://studio.example.com/hivemind/api/deployments/d-1/events"
    );
    let feed = deployment_feed_url("https://studio.example.com/hivemind", "d-1").expect("url");
    assert_eq!(
        feed.as_str(),
        "wss://studio.example.com/hivemind/ws/deployments/d-1/events"
    );
}

#[test]
fn log_events_query_always_sends_group() {
    let query = log_events_query(&LogFilter::for_group("/aws/lambda/api"));
    assert_eq!(query, [("group", "/aws/lambda/api".to_owned())]);
}

#[test]
fn log_events_query_includes_set_bounds_and_keyword() {
    let filter = LogFilter {
        keyword: "timeout".to_owned(),
        start_time: Some(100),
        end_time: Some(200),
        log_group_name: "app".to_owned(),
    };
    assert_eq!(
        log_events_query(&filter),
        [
            ("group", "app".to_owned()),
            ("start", "100".to_owned()),
            ("end", "200".to_owned()),
            ("keyword", "timeout".to_owned()),
        ]
    );
}

#[test]
fn log_stream_url_is_ws_and_encodes_group() {
    let client = ApiClient::new("https://studio.example.com").expect("valid");
    assert_eq!(
        client.log_stream_url("/aws/lambda/api").expect("url"),
        "wss://studio.example.com/ws/logs?group=%2Faws%2Flambda%2Fapi"
    );
}

#[test]
fn status_error_names_the_operation() {
    let err = ApiError::Status {
        what: "fetch agents".to_owned(),
        status: 503,
    };
    assert_eq!(err.to_string(), "fetch agents failed (503)");
}

#[tokio::test]
async fn log_feed_yields_decoded_events_and_skips_garbage() {
    let (client, transport, mut opens) = scripted_client("http://localhost:8000");
    transport.script(&[Outcome::Accept]);

    let mut feed = client.subscribe_log_stream("app").await.expect("feed opens");
    let attempt = opens.recv().await.expect("open recorded");
    assert_eq!(attempt.url, "ws://localhost:8000/ws/logs?group=app");

    let peer = transport.take_peer();
    peer.push(r#"{"timestamp":1,"message":"boot","logStreamName":"s1","ingestionTime":2}"#);
    peer.push("garbage");
    peer.push(r#"{"timestamp":3,"message":"ready","logStreamName":"s1","ingestionTime":4}"#);
    peer.close();

    let mut messages = Vec::new();
    while let Some(event) = feed.next().await {
        messages.push(event.message);
    }
    assert_eq!(messages, ["boot", "ready"]);
}

#[tokio::test]
async fn deployment_feed_ends_on_transport_error() {
    let (client, transport, _opens) = scripted_client("http://localhost:8000");
    transport.script(&[Outcome::Accept]);

    let mut feed = client
        .subscribe_deployment_events("d-1")
        .await
        .expect("feed opens");
    let peer = transport.take_peer();
    peer.push(r#"{"timestamp":1,"resourceType":"AWS::EC2::VPC","logicalResourceId":"VPC","status":"CREATE_IN_PROGRESS"}"#);
    peer.fail();
    peer.push(r#"{"timestamp":2,"resourceType":"AWS::EC2::VPC","logicalResourceId":"VPC","status":"CREATE_COMPLETE"}"#);

    let first = feed.next().await.expect("first event");
    assert_eq!(first.status, "CREATE_IN_PROGRESS");
    assert!(feed.next().await.is_none(), "feed stops at the error");
}

#[tokio::test]
async fn refused_feed_reports_connect_error() {
    let (client, _transport, _opens) = scripted_client("http://localhost:8000");
    let err = client.subscribe_log_stream("app").await.err().expect("refused");
    assert!(matches!(err, ApiError::WsConnect(TransportError::Connect(_))));
}

#[tokio::test]
async fn deployment_feed_encodes_the_id() {
    let (client, transport, mut opens) = scripted_client("http://localhost:8000");
    transport.script(&[Outcome::Accept]);

    let _feed = client
        .subscribe_deployment_events("d 1/../admin")
        .await
        .expect("feed opens");
    let attempt = opens.recv().await.expect("open recorded");
    assert_eq!(
        attempt.url,
        "ws://localhost:8000/ws/deployments/d%201%2F..%2Fadmin/events"
    );
}
