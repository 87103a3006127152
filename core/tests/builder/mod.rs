use std::collections::HashMap;

use anyhow::Result;
use http::Method;
use pretty_assertions::assert_eq;
use reqgate_core::{ApiRequest, MultiValueMap};

fn values(vs: &[&str]) -> Vec<String> {
    vs.iter().map(|v| v.to_string()).collect()
}

#[test]
fn test_request_from_url_with_method() -> Result<()> {
    let req = ApiRequest::builder_from_url("https://api.example.com/v1/items?id=123")?
        .set_method("PUT")?
        .build();

    assert_eq!(req.host(), "api.example.com");
    assert_eq!(req.port(), 443);
    assert_eq!(req.path(), "/v1/items");
    assert_eq!(req.method(), Method::PUT);
    assert_eq!(
        req.query_parameters(),
        &MultiValueMap::from([("id".to_string(), values(&["123"]))])
    );
    Ok(())
}

#[test]
fn test_headers_accumulate_in_order() -> Result<()> {
    let req = ApiRequest::builder("api.example.com")?
        .add_header("h1", "v1")
        .add_header("h1", "v2")
        .build();

    assert_eq!(req.headers()["h1"], values(&["v1", "v2"]));
    Ok(())
}

#[test]
fn test_snapshots_do_not_observe_later_mutations() -> Result<()> {
    let mut builder = ApiRequest::builder("api.example.com")?;
    let mut snapshots = Vec::new();
    for i in 0..5 {
        builder
            .add_header("x-step", &i.to_string())
            .set_query_parameter("step", &i.to_string());
        snapshots.push(builder.build());
    }

    for (i, req) in snapshots.iter().enumerate() {
        assert_eq!(req.headers()["x-step"].len(), i + 1);
        assert_eq!(req.query_parameters()["step"], vec![i.to_string()]);
    }
    Ok(())
}

#[test]
fn test_caller_maps_are_copied() -> Result<()> {
    let mut headers: HashMap<&str, Vec<&str>> = HashMap::from([("h", vec!["1"])]);

    let mut builder = ApiRequest::builder("api.example.com")?;
    builder.set_headers(headers.clone());
    headers.get_mut("h").unwrap().push("2");
    builder.set_query_parameters([("q", ["a", "b"])]);

    let req = builder.build();
    assert_eq!(req.headers()["h"], values(&["1"]));
    assert_eq!(req.query_parameters()["q"], values(&["a", "b"]));
    Ok(())
}

#[test]
fn test_built_request_is_shareable_across_threads() -> Result<()> {
    let req = ApiRequest::builder("api.example.com")?
        .add_header("h", "v")
        .build();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let req = req.clone();
            std::thread::spawn(move || req.headers()["h"].clone())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), values(&["v"]));
    }
    Ok(())
}
