//! Platform token normalization.
//!
//! Build pipelines report operating systems and architectures under several
//! spellings. The ledger stores exactly one spelling per platform, so every
//! os/arch token is folded through [`normalize`] before it is written or used
//! as a filter.
//!
//! # Example
//!
//! ```
//! use relledger_schema::normalize;
//!
//! assert_eq!(normalize("MacOS"), "apple");
//! assert_eq!(normalize("X86_64"), "amd64");
//! assert_eq!(normalize("linux"), "linux");
//! ```

use serde_json::Value;

/// Fold an os or arch token into its canonical spelling.
///
/// The token is lower-cased first, then the known aliases are rewritten.
/// Unknown tokens pass through lower-cased. The mapping is idempotent.
pub fn normalize(token: &str) -> String {
    let lower = token.to_lowercase();
    match lower.as_str() {
        "macos" => "apple".to_string(),
        "x86_64" => "amd64".to_string(),
        _ => lower,
    }
}

/// Element-wise [`normalize`] for list filters such as repeated `os=` params.
pub fn normalize_all<I, S>(tokens: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tokens
        .into_iter()
        .map(|token| normalize(token.as_ref()))
        .collect()
}

/// Normalize the `os` and `arch` members of a request `content` object in place.
///
/// Each member may be a single string or an array of strings; anything else is
/// left untouched so that the typed parse downstream can reject it.
pub fn normalize_content(content: &mut Value) {
    let Some(object) = content.as_object_mut() else {
        return;
    };

    for field in ["os", "arch"] {
        match object.get_mut(field) {
            Some(Value::String(token)) => *token = normalize(token),
            Some(Value::Array(items)) => {
                for item in items {
                    if let Value::String(token) = item {
                        *token = normalize(token);
                    }
                }
            }
            _ => {}
        }
    }
}
