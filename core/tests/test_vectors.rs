//! Check request building and response decoding against the JSON vectors in
//! `test-vectors/`.
//!
//! Request vectors pin the URL, the HTTP headers and fragments of the body.
//! Response vectors hold raw bodies and the expected result in JSON form, or
//! the expected error. Comparing JSON values avoids false negatives from
//! member ordering.

use softlayer_core::{
    ApiError, Client, ClientOptions, HttpResponse, Protocol, Soap, TransportError, Value, XmlRpc,
};

fn load(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap()
}

fn client_for<P: Protocol>(case: &serde_json::Value) -> Client<P> {
    let mut options = ClientOptions::default();
    if let Some(endpoint) = case["endpoint"].as_str() {
        options = options.with_endpoint(endpoint);
    }
    if let (Some(username), Some(api_key)) = (case["username"].as_str(), case["api_key"].as_str()) {
        options = options.with_credentials(username, api_key);
    }
    if let Some(id) = case["id"].as_i64() {
        options = options.with_id(id);
    }

    let mut client = Client::<P>::new(case["service"].as_str().unwrap(), options).unwrap();
    if let Some(mask) = case["mask"].as_str() {
        client.set_object_mask(mask);
    }
    if let Some(limit) = case["limit"].as_array() {
        client.set_result_limit(limit[0].as_i64().unwrap(), limit[1].as_i64().unwrap());
    }
    client
}

fn check_requests<P: Protocol>(vectors: &serde_json::Value) {
    for case in vectors["requests"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let client = client_for::<P>(case);
        let args: Vec<Value> = case["args"]
            .as_array()
            .unwrap()
            .iter()
            .cloned()
            .map(Value::from)
            .collect();

        let pending = client
            .build_call(case["method"].as_str().unwrap(), &args)
            .unwrap();
        let req = pending.request();
        assert_eq!(req.url, case["expected_url"].as_str().unwrap(), "{name}: url");

        let expected_headers: Vec<(String, String)> = case["expected_headers"]
            .as_array()
            .unwrap()
            .iter()
            .map(|pair| {
                (
                    pair[0].as_str().unwrap().to_string(),
                    pair[1].as_str().unwrap().to_string(),
                )
            })
            .collect();
        assert_eq!(req.headers, expected_headers, "{name}: headers");

        for fragment in case["body_contains"].as_array().unwrap() {
            let fragment = fragment.as_str().unwrap();
            assert!(req.body.contains(fragment), "{name}: body lacks {fragment}\n{}", req.body);
        }
        for fragment in case["body_excludes"].as_array().unwrap() {
            let fragment = fragment.as_str().unwrap();
            assert!(!req.body.contains(fragment), "{name}: body has {fragment}\n{}", req.body);
        }
    }
}

fn check_responses<P: Protocol>(vectors: &serde_json::Value) {
    for case in vectors["responses"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut client = Client::<P>::new("SoftLayer_Account", ClientOptions::default()).unwrap();
        let pending = client.build_call("getObject", &[]).unwrap();
        let response = HttpResponse {
            status: case["status"].as_u64().unwrap() as u16,
            headers: Vec::new(),
            body: case["body"].as_str().unwrap().to_string(),
        };
        let result = client.parse_call(pending, response);

        if let Some(fault) = case.get("fault") {
            match result {
                Err(ApiError::Transport(TransportError::Fault { code, message })) => {
                    assert_eq!(code, fault["code"].as_str().unwrap(), "{name}: fault code");
                    assert_eq!(message, fault["message"].as_str().unwrap(), "{name}: fault message");
                }
                other => panic!("{name}: expected fault, got {other:?}"),
            }
        } else if let Some(kind) = case["error"].as_str() {
            let err = result.unwrap_err();
            let matched = match kind {
                "http" => matches!(err, ApiError::Transport(TransportError::HttpError { .. })),
                "malformed" => matches!(err, ApiError::Transport(TransportError::Malformed(_))),
                other => panic!("unknown error kind: {other}"),
            };
            assert!(matched, "{name}: expected {kind} error, got {err:?}");
        } else {
            let value = result.unwrap_or_else(|e| panic!("{name}: {e}"));
            assert_eq!(value.to_json(), case["expected"], "{name}: result");
        }
    }
}

#[test]
fn xmlrpc_request_vectors() {
    check_requests::<XmlRpc>(&load(include_str!("../../test-vectors/xmlrpc.json")));
}

#[test]
fn xmlrpc_response_vectors() {
    check_responses::<XmlRpc>(&load(include_str!("../../test-vectors/xmlrpc.json")));
}

#[test]
fn soap_request_vectors() {
    check_requests::<Soap>(&load(include_str!("../../test-vectors/soap.json")));
}

#[test]
fn soap_response_vectors() {
    check_responses::<Soap>(&load(include_str!("../../test-vectors/soap.json")));
}

#[test]
fn http_errors_keep_status_and_body() {
    let vectors = load(include_str!("../../test-vectors/xmlrpc.json"));
    let case = vectors["responses"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["error"] == "http")
        .unwrap();

    let mut client = Client::<XmlRpc>::new("SoftLayer_Account", ClientOptions::default()).unwrap();
    let pending = client.build_call("getObject", &[]).unwrap();
    let err = client
        .parse_call(
            pending,
            HttpResponse {
                status: 503,
                headers: Vec::new(),
                body: case["body"].as_str().unwrap().to_string(),
            },
        )
        .unwrap_err();
    match err {
        ApiError::Transport(TransportError::HttpError { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "Service Unavailable");
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }
}
