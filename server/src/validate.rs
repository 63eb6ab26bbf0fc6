//! Request validation with field-level issue reporting.
//!
//! Every violation is collected rather than failing on the first, so a 400
//! response carries the full list of problems.

use crate::error::{ApiError, FieldIssue};

const MAX_TITLE_LEN: usize = 500;
const MAX_CONTENT_LEN: usize = 10_000;

#[derive(Default)]
pub struct Validator {
    issues: Vec<FieldIssue>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            message: message.into(),
        });
    }

    /// Require a non-empty trimmed string
    pub fn require_non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.issue(field, "must not be empty");
        }
    }

    pub fn require_max_len(&mut self, field: &str, value: &str, max: usize) {
        if value.len() > max {
            self.issue(field, format!("must be at most {max} characters"));
        }
    }

    pub fn require_range(&mut self, field: &str, value: i64, min: i64, max: i64) {
        if value < min || value > max {
            self.issue(field, format!("must be between {min} and {max}"));
        }
    }

    /// Parse an optional string field, recording an issue on failure
    pub fn parse_opt<T>(
        &mut self,
        field: &str,
        raw: Option<&str>,
        parse: impl Fn(&str) -> Option<T>,
        expected: &str,
    ) -> Option<T> {
        match raw {
            Some(value) => match parse(value) {
                Some(parsed) => Some(parsed),
                None => {
                    self.issue(field, format!("must be one of: {expected}"));
                    None
                }
            },
            None => None,
        }
    }

    /// Metadata must be a JSON object when present
    pub fn require_object(&mut self, field: &str, value: &Option<serde_json::Value>) {
        if let Some(value) = value {
            if !value.is_object() {
                self.issue(field, "must be a JSON object");
            }
        }
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.issues.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.issues))
        }
    }
}

pub fn title_limits(v: &mut Validator, title: &str) {
    v.require_non_empty("title", title);
    v.require_max_len("title", title, MAX_TITLE_LEN);
}

pub fn content_limits(v: &mut Validator, field: &str, content: &str) {
    v.require_non_empty(field, content);
    v.require_max_len(field, content, MAX_CONTENT_LEN);
}

#[cfg(test)]
mod tests {
    use super::*;
    use vibex_store::TaskStatus;

    #[test]
    fn test_empty_validator_passes() {
        assert!(Validator::new().finish().is_ok());
    }

    #[test]
    fn test_collects_multiple_issues() {
        let mut v = Validator::new();
        v.require_non_empty("title", "  ");
        v.require_range("importance", 42, 1, 10);
        match v.finish() {
            Err(ApiError::Validation(issues)) => {
                assert_eq!(issues.len(), 2);
                assert_eq!(issues[0].field, "title");
                assert_eq!(issues[1].field, "importance");
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_opt_valid() {
        let mut v = Validator::new();
        let status = v.parse_opt("status", Some("review"), TaskStatus::parse, "pending, ...");
        assert_eq!(status, Some(TaskStatus::Review));
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_parse_opt_invalid_records_issue() {
        let mut v = Validator::new();
        let status = v.parse_opt("status", Some("archived"), TaskStatus::parse, "pending, ...");
        assert!(status.is_none());
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_parse_opt_absent_is_fine() {
        let mut v = Validator::new();
        let status = v.parse_opt("status", None, TaskStatus::parse, "pending, ...");
        assert!(status.is_none());
        assert!(v.finish().is_ok());
    }

    #[test]
    fn test_require_object() {
        let mut v = Validator::new();
        v.require_object("metadata", &Some(serde_json::json!({"k": 1})));
        assert!(v.finish().is_ok());

        let mut v = Validator::new();
        v.require_object("metadata", &Some(serde_json::json!([1, 2])));
        assert!(v.finish().is_err());
    }

    #[test]
    fn test_title_limits() {
        let mut v = Validator::new();
        title_limits(&mut v, &"x".repeat(600));
        assert!(v.finish().is_err());

        let mut v = Validator::new();
        title_limits(&mut v, "fine");
        assert!(v.finish().is_ok());
    }
}
