/// Quotes `text` the way it would appear in a JSON document, for use in
/// diagnostics.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| format!("\"{}\"", text))
}

#[test]
fn quotes_and_escapes() {
    assert_eq!(quote("HEARTBEAT"), "\"HEARTBEAT\"");
    assert_eq!(quote("a\"b"), "\"a\\\"b\"");
}
