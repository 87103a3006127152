use anyhow::Result;
use http::StatusCode;
use pretty_assertions::assert_eq;
use reqgate_core::{ApiRequest, BlockingClient, ErrorKind};
use serde::{Deserialize, Serialize};

use crate::mock::{anonymous_factory, factory, init_logger, MockTransport, Reply};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    a: i32,
    b: String,
}

#[test]
fn test_invoke_decodes_body() -> Result<()> {
    init_logger();

    let transport = MockTransport::new(Reply::with(
        StatusCode::OK,
        "OK",
        br#"{"a":24,"b":"AppleBee!"}"#,
    ));
    let client = BlockingClient::new(factory(), transport);

    let req = ApiRequest::builder("api.example.com")?.build();
    let resp = client.invoke(&req)?;

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
    Ok(())
}

#[test]
fn test_invoke_without_body() -> Result<()> {
    init_logger();

    let client = BlockingClient::new(factory(), MockTransport::new(Reply::echo()).bodiless());
    let req = ApiRequest::builder("api.example.com")?.build();
    let resp = client.invoke(&req)?;

    assert_eq!(resp.status_code(), 200);
    assert!(resp.body().is_empty());
    Ok(())
}

#[test]
fn test_json_payload_round_trip() -> Result<()> {
    init_logger();

    let transport = MockTransport::new(Reply::echo());
    let client = BlockingClient::new(factory(), transport.clone());

    let item = Item {
        a: 7,
        b: "round trip".to_string(),
    };
    let req = ApiRequest::builder("api.example.com")?
        .set_method("POST")?
        .set_path("/echo")?
        .set_api_key("0123456789abcdef")
        .set_json_payload(&item)?
        .build();
    let resp = client.invoke(&req)?;

    assert_eq!(resp.read_object::<Item>()?, item);
    // Decoding twice yields the same value.
    assert_eq!(resp.read_object::<Item>()?, item);

    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].headers["content-type"], "application/json");
    assert_eq!(
        sent[0].headers["content-length"],
        serde_json::to_vec(&item)?.len().to_string().as_str()
    );
    assert_eq!(sent[0].headers["x-api-key"], "0123456789abcdef");
    assert_eq!(sent[0].headers["authorization"], "Token t0k3n");
    Ok(())
}

#[test]
fn test_unsuccessful_status_is_not_an_error() -> Result<()> {
    init_logger();

    let transport = MockTransport::new(Reply::with(
        StatusCode::NOT_FOUND,
        "Not Found",
        br#"{"message":"missing"}"#,
    ));
    let client = BlockingClient::new(factory(), transport);

    let resp = client.invoke(&ApiRequest::builder("api.example.com")?.build())?;
    assert!(!resp.is_successful());
    assert_eq!(resp.status_code(), 404);
    assert_eq!(resp.read_tree()?["message"], "missing");
    Ok(())
}

#[test]
fn test_transport_error_propagates() -> Result<()> {
    init_logger();

    let client = BlockingClient::new(factory(), MockTransport::new(Reply::echo()).failing());
    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Transport);
    Ok(())
}

#[test]
fn test_signing_error_stops_invocation() -> Result<()> {
    init_logger();

    let transport = MockTransport::new(Reply::echo());
    let client = BlockingClient::new(anonymous_factory(), transport.clone());
    let err = client
        .invoke(&ApiRequest::builder("api.example.com")?.build())
        .unwrap_err();

    assert!(err.is_credential_error());
    assert!(transport.sent.lock().unwrap().is_empty());
    Ok(())
}

#[test]
fn test_replayed_payload_is_rejected() -> Result<()> {
    init_logger();

    let client = BlockingClient::new(factory(), MockTransport::new(Reply::echo()));
    let req = ApiRequest::builder("api.example.com")?
        .set_method("PUT")?
        .set_payload(&b"once"[..])
        .build();

    assert_eq!(client.invoke(&req)?.body_string(), "once");
    assert_eq!(
        client.invoke(&req).unwrap_err().kind(),
        ErrorKind::RequestInvalid
    );
    Ok(())
}
