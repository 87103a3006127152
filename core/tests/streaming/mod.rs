use std::sync::Arc;

use anyhow::Result;
use http::StatusCode;
use pretty_assertions::assert_eq;
use reqgate_core::{ApiRequest, AsyncClient, ErrorKind};
use serde::{Deserialize, Serialize};
use test_case::test_case;

use crate::mock::{anonymous_factory, factory, init_logger, MockAsyncTransport, Reply};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    a: i32,
    b: String,
}

fn scenario_a() -> Reply {
    Reply::with(StatusCode::OK, "OK", br#"{"a":24,"b":"AppleBee!"}"#)
}

#[test_case(false; "headers first")]
#[test_case(true; "subscription first")]
#[tokio::test]
async fn test_invoke_decodes_body(subscription_first: bool) -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(scenario_a()).subscription_first(subscription_first);
    let client = AsyncClient::new(factory(), transport.clone());

    let resp = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await?;

    assert_eq!(resp.status_code(), 200);
    assert_eq!(resp.status_text(), Some("OK"));
    assert!(resp.is_successful());
    assert_eq!(
        resp.read_object::<Item>()?,
        Item {
            a: 24,
            b: "AppleBee!".to_string()
        }
    );

    // Credit is granted once, for exactly the declared length.
    let credit = transport.last_credit();
    assert_eq!(credit.requests(), vec![24]);
    assert!(!credit.is_cancelled());
    Ok(())
}

#[test_case(1; "one byte chunks")]
#[test_case(5; "small chunks")]
#[test_case(4096; "single chunk")]
#[tokio::test]
async fn test_json_payload_round_trip(chunk_size: u64) -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(Reply::echo()).with_chunk_size(chunk_size);
    let client = AsyncClient::new(factory(), transport.clone());

    let item = Item {
        a: -3,
        b: "streamed back".to_string(),
    };
    let req = ApiRequest::builder("api.example.com")?
        .set_method("POST")?
        .set_json_payload(&item)?
        .build();
    let resp = client.invoke(&req).await?;

    assert_eq!(resp.read_object::<Item>()?, item);
    assert_eq!(resp.read_object::<Item>()?, item);
    assert_eq!(
        transport.last_credit().total(),
        serde_json::to_vec(&item)?.len() as u64
    );
    Ok(())
}

#[test_case(1000; "chunks within the window")]
#[test_case(3000; "chunks straddling the window")]
#[test_case(65_536; "chunks larger than the body")]
#[tokio::test]
async fn test_unknown_length_is_drained_until_completion(chunk_size: u64) -> Result<()> {
    init_logger();

    let payload = vec![b'z'; 20_000];
    let transport = MockAsyncTransport::new(Reply::echo())
        .with_chunk_size(chunk_size)
        .with_declared_length(None);
    let client = AsyncClient::new(factory(), transport.clone());

    let req = ApiRequest::builder("api.example.com")?
        .set_method("PUT")?
        .set_payload(std::io::Cursor::new(payload.clone()))
        .build();
    let resp = client.invoke(&req).await?;

    assert_eq!(resp.body().as_ref(), payload.as_slice());
    let credit = transport.last_credit();
    assert!(credit.requests().iter().all(|n| *n == 8192));
    assert!(credit.total() >= payload.len() as u64);
    Ok(())
}

#[test_case(false; "headers first")]
#[test_case(true; "subscription first")]
#[tokio::test]
async fn test_empty_body(subscription_first: bool) -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(Reply::with(StatusCode::NO_CONTENT, "No Content", b""))
        .subscription_first(subscription_first);
    let client = AsyncClient::new(factory(), transport.clone());

    let resp = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await?;

    assert_eq!(resp.status_code(), 204);
    assert!(resp.body().is_empty());
    assert!(transport.last_credit().requests().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_head_response_has_no_body() -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(Reply::with(StatusCode::OK, "OK", b""))
        .with_declared_length(Some(512));
    let client = AsyncClient::new(factory(), transport);

    let req = ApiRequest::builder("api.example.com")?
        .set_method("HEAD")?
        .build();
    let resp = client.invoke(&req).await?;

    assert!(resp.is_successful());
    assert!(resp.body().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unsuccessful_status_is_not_an_error() -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(Reply::with(
        StatusCode::FORBIDDEN,
        "Forbidden",
        br#"{"message":"Forbidden"}"#,
    ));
    let client = AsyncClient::new(factory(), transport);

    let resp = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await?;

    assert!(!resp.is_successful());
    assert_eq!(resp.status_code(), 403);
    assert_eq!(resp.read_tree()?["message"], "Forbidden");
    Ok(())
}

#[tokio::test]
async fn test_send_failure_propagates() -> Result<()> {
    init_logger();

    let client = AsyncClient::new(factory(), MockAsyncTransport::new(scenario_a()).failing_send());
    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    Ok(())
}

#[tokio::test]
async fn test_stream_failure_rejects_response() -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(scenario_a())
        .with_chunk_size(3)
        .failing_after(10);
    let client = AsyncClient::new(factory(), transport.clone());

    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert_eq!(err.message(), "connection reset");
    assert!(transport.last_credit().is_cancelled());
    Ok(())
}

#[tokio::test]
async fn test_truncated_body_is_an_error() -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(scenario_a()).with_declared_length(Some(100));
    let client = AsyncClient::new(factory(), transport.clone());

    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(transport.last_credit().is_cancelled());
    Ok(())
}

#[tokio::test]
async fn test_abandoned_handler_is_an_error() -> Result<()> {
    init_logger();

    let client = AsyncClient::new(
        factory(),
        MockAsyncTransport::new(scenario_a()).dropping_handler(),
    );
    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unexpected);
    Ok(())
}

#[tokio::test]
async fn test_signing_error_propagates() -> Result<()> {
    init_logger();

    let transport = MockAsyncTransport::new(scenario_a());
    let client = AsyncClient::new(anonymous_factory(), transport.clone());
    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CredentialInvalid);
    assert!(transport.credit.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_invocations_are_isolated() -> Result<()> {
    init_logger();

    let client = Arc::new(AsyncClient::new(
        factory(),
        MockAsyncTransport::new(Reply::echo()).with_chunk_size(2),
    ));

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let item = Item {
                a: i,
                b: format!("item-{i}"),
            };
            let req = ApiRequest::builder("api.example.com")?
                .set_method("POST")?
                .set_json_payload(&item)?
                .build();
            let resp = client.invoke(&req).await?;
            anyhow::Ok((item, resp.read_object::<Item>()?))
        }));
    }

    for task in tasks {
        let (sent, received) = task.await??;
        assert_eq!(sent, received);
    }
    Ok(())
}
