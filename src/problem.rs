//! RFC 7807 problem details.
//!
//! The backend reports failures as `application/problem+json` objects, or in a
//! legacy `{error, code}` shape. [`ProblemDetails`] reads both; members it does
//! not know (such as `projectName` on a duplicate-name conflict) land in
//! [`ProblemDetails::extensions`].

use crate::response::ResponseBody;
use serde::Deserialize;
use serde_json::{Map, Value};

/// A problem-details error body.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProblemDetails {
    /// URI reference identifying the problem type.
    #[serde(rename = "type")]
    pub problem_type: Option<String>,
    pub title: Option<String>,
    pub status: Option<u16>,
    /// Human-readable explanation specific to this occurrence.
    pub detail: Option<String>,
    pub instance: Option<String>,
    /// Machine-readable discriminant, e.g. `CONFLICT` or `DUPLICATE_PROJECT_NAME`.
    pub code: Option<String>,
    /// Legacy message field.
    pub error: Option<String>,
    #[serde(flatten)]
    pub extensions: Map<String, Value>,
}

impl ProblemDetails {
    /// Reads problem details out of a JSON object body.
    ///
    /// Returns `None` for text bodies and for JSON that is not an object or
    /// whose known members have the wrong types.
    pub fn from_body(body: &ResponseBody) -> Option<Self> {
        match body {
            ResponseBody::Json(value @ Value::Object(_)) => {
                serde_json::from_value(value.clone()).ok()
            }
            _ => None,
        }
    }

    /// Looks up an extension member by name.
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extensions.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_problem_document() {
        let body = ResponseBody::Json(json!({
            "type": "https://example.com/problems/duplicate-project-name",
            "title": "Duplicate project name",
            "status": 409,
            "detail": "同名のプロジェクトが既に存在します",
            "code": "DUPLICATE_PROJECT_NAME",
            "projectName": "Tower A"
        }));

        let problem = ProblemDetails::from_body(&body).unwrap();
        assert_eq!(problem.status, Some(409));
        assert_eq!(problem.code.as_deref(), Some("DUPLICATE_PROJECT_NAME"));
        assert_eq!(problem.detail.as_deref(), Some("同名のプロジェクトが既に存在します"));
        assert_eq!(problem.extension("projectName"), Some(&json!("Tower A")));
    }

    #[test]
    fn test_legacy_shape() {
        let body = ResponseBody::Json(json!({"error": "Conflict", "code": "CONFLICT"}));
        let problem = ProblemDetails::from_body(&body).unwrap();
        assert_eq!(problem.error.as_deref(), Some("Conflict"));
        assert_eq!(problem.code.as_deref(), Some("CONFLICT"));
        assert!(problem.detail.is_none());
    }

    #[test]
    fn test_non_object_bodies() {
        assert!(ProblemDetails::from_body(&ResponseBody::Text("oops".into())).is_none());
        assert!(ProblemDetails::from_body(&ResponseBody::Json(json!([1, 2]))).is_none());
    }
}
