use serde_json::{Value, json};

/// Fixed extraction returned by the mock PDF processor.
pub fn sample_extraction() -> Value {
    json!({
        "mst": "0100366745",
        "vendor": "CÔNG TY TNHH DƯỢC PHẨM ĐA PHÚC",
        "item_des": [
            {"id": "1", "product_name": "Enterogermina 2 billion/5ml (20 ống/H)"},
            {"id": "2", "product_name": "Refresh-tears mắt 15ml HQ."}
        ]
    })
}
