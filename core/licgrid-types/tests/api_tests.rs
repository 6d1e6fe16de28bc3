use licgrid_types::ApiResponse;

#[test]
fn ok_envelope_carries_data() {
    let resp = ApiResponse::ok(42);
    assert!(resp.is_ok());
    assert_eq!(resp.code, 200);
    assert_eq!(resp.data, Some(42));
}

#[test]
fn fail_envelope_has_no_data() {
    let resp: ApiResponse<String> = ApiResponse::fail(403, "license code rejected");
    assert!(!resp.is_ok());
    assert_eq!(resp.code, 403);
    assert_eq!(resp.message, "license code rejected");
    assert!(resp.data.is_none());
}

#[test]
fn envelope_serializes_null_data() {
    let resp: ApiResponse<String> = ApiResponse::fail(404, "not found");
    let json = serde_json::to_value(&resp).unwrap();
    assert!(json.get("data").unwrap().is_null());
}

#[test]
fn envelope_round_trips() {
    let resp = ApiResponse::ok_with("registered", "8f14e45fceea167a5a36dedd4bea2543".to_string());
    let json = serde_json::to_string(&resp).unwrap();
    let back: ApiResponse<String> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.code, 200);
    assert_eq!(back.message, "registered");
    assert_eq!(back.data.as_deref(), Some("8f14e45fceea167a5a36dedd4bea2543"));
}
