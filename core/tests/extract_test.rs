use henhouse_core::extract::{extract_object, find_sentinel_object};
use henhouse_core::extract_payload;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Research {
    success: bool,
    breed_id: i64,
    report: String,
    sources: Vec<String>,
}

#[test]
fn object_wrapped_in_prose_is_returned_exactly() {
    let text = r#"Here is the result: {"success": true, "breedId": 5, "report": "Calm {and} fluffy", "sources": ["https://a"]} Thanks!"#;
    let value = extract_object(text, "success").unwrap();
    assert_eq!(
        value,
        json!({"success": true, "breedId": 5, "report": "Calm {and} fluffy", "sources": ["https://a"]})
    );
}

#[test]
fn payload_survives_prose_round_trip() {
    let payloads = vec![
        Research {
            success: true,
            breed_id: 1,
            report: "Plain report".into(),
            sources: vec!["https://a".into()],
        },
        Research {
            success: true,
            breed_id: 42,
            report: r#"Quotes "inside", braces {} and \ backslashes"#.into(),
            sources: vec![],
        },
        Research {
            success: false,
            breed_id: -1,
            report: "}{ unbalanced in string".into(),
            sources: vec!["https://x/{y}".into(), "https://z".into()],
        },
    ];
    let wrappers = [
        ("", ""),
        ("Result:\n", "\nDone."),
        ("I saved it {as requested}: ", " -- let me know!"),
        ("```json\n", "\n```"),
    ];

    for payload in &payloads {
        let encoded = serde_json::to_string(payload).unwrap();
        for (before, after) in wrappers {
            let text = format!("{before}{encoded}{after}");
            let back: Research = extract_payload(&text, "success").unwrap();
            assert_eq!(&back, payload, "text: {text}");
        }
    }
}

#[test]
fn no_structure_means_none() {
    assert_eq!(extract_payload::<Value>("Chickens are great", "success"), None);
    assert_eq!(extract_payload::<Value>("   ", "success"), None);
    assert_eq!(find_sentinel_object(r#"{"success": true"#, "success"), None);
}

#[test]
fn only_first_sentinel_is_considered() {
    let text = r#"first {"success": "yes", "breedId": 1} then {"success": true, "breedId": 2}"#;
    let value = extract_object(text, "success").unwrap();
    assert_eq!(value["breedId"], 1);
}
