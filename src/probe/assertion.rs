// src/probe/assertion.rs
use crate::config::Assertions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub up: bool,
    pub message: String,
}

impl Verdict {
    fn pass() -> Self {
        Self {
            up: true,
            message: "OK".to_string(),
        }
    }

    fn fail(message: String) -> Self {
        Self { up: false, message }
    }
}

/// Whether the body must be downloaded to evaluate these assertions.
pub fn needs_body(assertions: Option<&Assertions>) -> bool {
    assertions.map_or(false, |a| a.contains_text.is_some())
}

/// Classify a received response. The substring check only runs once the
/// status check has passed.
pub fn evaluate(assertions: Option<&Assertions>, status_code: u16, body: Option<&str>) -> Verdict {
    let Some(assertions) = assertions else {
        return Verdict::pass();
    };

    if let Some(expected) = &assertions.status {
        if !expected.contains(&status_code) {
            let joined = expected
                .iter()
                .map(|code| code.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Verdict::fail(format!("Expected status {}, got {}", joined, status_code));
        }
    }

    if let Some(needle) = &assertions.contains_text {
        if !body.unwrap_or("").contains(needle.as_str()) {
            return Verdict::fail(format!(
                "Response does not contain expected text: {}",
                needle
            ));
        }
    }

    Verdict::pass()
}
