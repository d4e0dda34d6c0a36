//! Code cleanup is idempotent

use proptest::prelude::*;
use sentinel::sanitize::sanitize;

/// Lines drawn from the shapes backends actually emit
fn snippet_line() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("```python".to_string()),
        Just("```".to_string()),
        Just("import pytest".to_string()),
        Just("def test_create_user(api_context: APIRequestContext):".to_string()),
        Just("def test_lookup(api_context):".to_string()),
        Just("def test_plain():".to_string()),
        Just("    with playwright.request.new_context(base_url=URL) as ctx:".to_string()),
        Just("        ctx.post('/users')".to_string()),
        Just("    name = page.uuid4()".to_string()),
        Just("    stamp = request.timestamp()".to_string()),
        Just("    resp = api_context.get('/health')".to_string()),
        Just("    svc = MagicMock()".to_string()),
        Just("    assert resp.ok".to_string()),
        Just("".to_string()),
        "[ a-z_().=']{0,30}",
    ]
}

proptest! {
    #[test]
    fn sanitize_is_idempotent(lines in prop::collection::vec(snippet_line(), 0..12)) {
        let code = lines.join("\n");
        let once = sanitize(&code);
        prop_assert_eq!(sanitize(&once), once.clone());
    }

    #[test]
    fn sanitized_code_has_no_fences(lines in prop::collection::vec(snippet_line(), 0..12)) {
        let cleaned = sanitize(&lines.join("\n"));
        prop_assert!(!cleaned.contains("```python"));
    }
}
