//! Structured data embedded in pages.
//!
//! Pages carry their data as `const <name> = <json>;` inside an inline
//! `<script>`. The JSON is escaped so that it cannot close the script element
//! or be read as a template placeholder, and [`extract`] reads it back.

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Payload errors.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// No `const <name> = ` assignment in the page.
    #[error("no `const {0} = ` assignment found")]
    Missing(String),

    /// The assignment appears more than once.
    #[error("`const {0} = ` is assigned more than once")]
    Duplicate(String),

    /// The assigned value is not valid JSON for the requested type.
    #[error("invalid JSON for `{name}`: {source}")]
    Json {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for payload operations.
pub type Result<T> = std::result::Result<T, PayloadError>;

/// Serialize `value` as JSON safe to place inside `<script>`.
///
/// `<`, `>`, `&`, `=`, `;`, U+2028 and U+2029 become `\uXXXX` escapes and
/// `{{` becomes `{\u007b`. All of these occur only inside JSON strings, so the
/// text still parses to the same value, and manifest text can neither repeat a
/// `const <name> = ` marker nor end the statement early.
pub fn to_script_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let json = serde_json::to_string(value)?;
    let mut out = String::with_capacity(json.len() + json.len() / 16);
    let mut prev_brace = false;
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '=' => out.push_str("\\u003d"),
            ';' => out.push_str("\\u003b"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            '{' if prev_brace => {
                out.push_str("\\u007b");
                prev_brace = false;
                continue;
            }
            c => out.push(c),
        }
        prev_brace = c == '{';
    }
    Ok(out)
}

/// Find `const <name> = ` in `html` and parse the single JSON value after it.
///
/// The assignment must occur exactly once.
pub fn extract<T: DeserializeOwned>(html: &str, name: &str) -> Result<T> {
    let marker = format!("const {name} = ");
    let mut found = html.match_indices(&marker);
    let (start, _) = found
        .next()
        .ok_or_else(|| PayloadError::Missing(name.to_string()))?;
    if found.next().is_some() {
        return Err(PayloadError::Duplicate(name.to_string()));
    }

    let rest = &html[start + marker.len()..];
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<T>();
    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(source)) => Err(PayloadError::Json {
            name: name.to_string(),
            source,
        }),
        None => Err(PayloadError::Missing(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        caveats: String,
    }

    fn sample(caveats: &str) -> Sample {
        Sample {
            name: "iconwolf".to_string(),
            caveats: caveats.to_string(),
        }
    }

    #[test]
    fn test_script_json_escapes() {
        let json = to_script_json(&sample("</script><b>&\u{2028}\u{2029}")).unwrap();
        assert!(!json.contains('<'));
        assert!(!json.contains('>'));
        assert!(!json.contains('&'));
        assert!(json.contains(r"\u003c/script\u003e"));
        assert!(json.contains(r"\u2028\u2029"));
    }

    #[test]
    fn test_script_json_breaks_template_tokens() {
        let json = to_script_json(&sample("{{ DATA }} and {{{x")).unwrap();
        assert!(!json.contains("{{"));
        assert!(json.contains(r"{\u007b DATA }}"));
    }

    #[test]
    fn test_extract_round_trip() {
        let value = sample("Run </script> {{ TITLE }} & more\nlines");
        let html = format!(
            "<script>\n    const data = {};\n    console.log(data);\n</script>",
            to_script_json(&value).unwrap()
        );
        let back: Sample = extract(&html, "data").unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_script_json_hides_assignment_text() {
        let value = sample("const data = {};\n export PATH=\"${HOME}\";");
        let json = to_script_json(&value).unwrap();
        assert!(!json.contains('='));
        assert!(!json.contains(';'));

        let html = format!("<script>\n    const data = {json};\n</script>");
        let back: Sample = extract(&html, "data").unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_extract_missing_and_duplicate() {
        let err = extract::<Sample>("<script></script>", "formula").unwrap_err();
        assert!(matches!(err, PayloadError::Missing(_)));

        let html = r#"const data = {"name":"a","caveats":""}; const data = {};"#;
        let err = extract::<Sample>(html, "data").unwrap_err();
        assert!(matches!(err, PayloadError::Duplicate(_)));
    }

    #[test]
    fn test_extract_invalid_json() {
        let err = extract::<Sample>("const formula = {\"name\": };", "formula").unwrap_err();
        assert!(matches!(err, PayloadError::Json { .. }));
    }

    #[test]
    fn test_extract_distinguishes_names() {
        let html = r#"const formula = {"name":"a","caveats":""};
const data = {"name":"b","caveats":"c"};"#;
        let formula: Sample = extract(html, "formula").unwrap();
        let data: Sample = extract(html, "data").unwrap();
        assert_eq!(formula.name, "a");
        assert_eq!(data.caveats, "c");
    }
}
