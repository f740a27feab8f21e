//! 마이크로서비스 결과 봉투
//!
//! HTTP 백엔드 서비스는 도구 출력을 다음 형태로 감싸서 반환합니다.
//!
//! ```text
//! {"findings": [...], "raw_output": "...", "output_data": "...", "metadata": {...}}
//! ```
//!
//! 봉투가 아닌 입력(도구 출력 그 자체)은 그대로 파서에 전달됩니다.

use serde_json::Value;

/// 봉투 해석 결과
#[derive(Debug, PartialEq)]
pub(crate) enum Envelope {
    /// 봉투가 아님: 원문 그대로 파싱
    Bare,
    /// 봉투: 도구 고유 출력과 서비스가 미리 만든 일반 finding
    Wrapped {
        native: Option<String>,
        findings: Vec<Value>,
    },
}

/// `output_data`, `raw_output` 순으로 비어 있지 않은 도구 출력을 찾습니다.
pub(crate) fn unwrap(input: &str) -> Envelope {
    let trimmed = input.trim_start();
    if !trimmed.starts_with('{') {
        return Envelope::Bare;
    }
    let Ok(Value::Object(mut map)) = serde_json::from_str::<Value>(trimmed) else {
        return Envelope::Bare;
    };
    if !map.contains_key("raw_output") && !map.contains_key("output_data") {
        return Envelope::Bare;
    }

    let native = ["output_data", "raw_output"]
        .into_iter()
        .filter_map(|key| map.get(key).and_then(native_text))
        .next();
    let findings = match map.remove("findings") {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    };
    Envelope::Wrapped { native, findings }
}

fn native_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        // 서비스가 도구 JSON 을 문자열 대신 값으로 넣은 경우
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn bare_tool_output() {
        assert_eq!(unwrap("<nmaprun/>"), Envelope::Bare);
        assert_eq!(unwrap(r#"{"site":[]}"#), Envelope::Bare);
        assert_eq!(unwrap("{\"info\":{}}\n{\"info\":{}}"), Envelope::Bare);
    }

    #[test]
    fn output_data_wins_over_raw_output() {
        let input = json!({
            "findings": [],
            "raw_output": "console text",
            "output_data": "{\"info\":{}}"
        })
        .to_string();
        assert_eq!(
            unwrap(&input),
            Envelope::Wrapped {
                native: Some("{\"info\":{}}".to_owned()),
                findings: vec![],
            }
        );
    }

    #[test]
    fn empty_output_data_falls_back_to_raw_output() {
        let input = json!({"raw_output": "<nmaprun/>", "output_data": ""}).to_string();
        assert!(matches!(
            unwrap(&input),
            Envelope::Wrapped { native: Some(n), .. } if n == "<nmaprun/>"
        ));
    }

    #[test]
    fn structured_output_data_is_serialized() {
        let input = json!({"output_data": [{"firewall": "None"}], "findings": [{"title": "x"}]})
            .to_string();
        let Envelope::Wrapped { native, findings } = unwrap(&input) else {
            panic!("expected envelope");
        };
        assert_eq!(native.as_deref(), Some(r#"[{"firewall":"None"}]"#));
        assert_eq!(findings.len(), 1);
    }
}
