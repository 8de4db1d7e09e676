//! Response bodies and the typed success wrapper.
//!
//! Bodies are decoded by the response's declared content type: JSON types
//! become [`ResponseBody::Json`], everything else (including a missing
//! content type) becomes [`ResponseBody::Text`]. The [`Response`] type wraps
//! the caller's typed data along with metadata about the call.

use http::header::CONTENT_TYPE;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// A decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Parsed from a JSON content type.
    Json(Value),
    /// Read as text from any other content type.
    Text(String),
}

impl ResponseBody {
    /// Decodes raw bytes according to the `content-type` header.
    ///
    /// # Errors
    ///
    /// Returns the parser's message if a JSON body is malformed. Text bodies
    /// always decode; invalid UTF-8 is replaced with `U+FFFD`.
    pub fn decode(headers: &HeaderMap, bytes: &[u8]) -> std::result::Result<Self, String> {
        if is_json_content_type(headers) {
            serde_json::from_slice(bytes)
                .map(ResponseBody::Json)
                .map_err(|e| e.to_string())
        } else {
            Ok(ResponseBody::Text(String::from_utf8_lossy(bytes).into_owned()))
        }
    }

    /// Returns the string value of a top-level field of a JSON object body.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        match self {
            ResponseBody::Json(value) => value.get(field)?.as_str(),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            ResponseBody::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Json(_) => None,
            ResponseBody::Text(text) => Some(text),
        }
    }

    /// Converts the body into the caller's type.
    ///
    /// Text bodies convert as a JSON string, so `String` and `Value` both
    /// work. An empty text body (as sent with `204 No Content`) also converts
    /// as JSON `null`, which covers `()` and `Option<T>`.
    pub fn to_typed<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        match self {
            ResponseBody::Json(value) => T::deserialize(value),
            ResponseBody::Text(text) => match T::deserialize(&Value::String(text.clone())) {
                Err(_) if text.is_empty() => T::deserialize(&Value::Null),
                result => result,
            },
        }
    }
}

/// Returns `true` for `application/json` and any `+json` structured suffix
/// such as `application/problem+json`.
pub(crate) fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// A successful API response.
///
/// Dereferences to the typed data, so most callers use it as if it were `T`.
///
/// # Examples
///
/// ```no_run
/// use sitework_api::ApiClient;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Project {
///     id: String,
///     name: String,
/// }
///
/// # async fn example(client: &ApiClient) -> Result<(), sitework_api::ApiError> {
/// let project = client.get::<Project>("/api/projects/p-1").await?;
/// println!("{} ({})", project.name, project.id);
/// println!("took {:?} over {} attempt(s)", project.latency, project.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until the successful response, including
    /// retry delays and a refresh-and-replay cycle.
    pub latency: Duration,

    /// Number of physical attempts, counting a replay after token refresh.
    pub attempts: usize,
}

impl<T> Response<T> {
    pub fn new(
        data: T,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data to a different type, keeping the metadata.
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if more than one attempt was needed.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Discards the metadata.
    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    fn headers_with(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type(&headers_with("application/json")));
        assert!(is_json_content_type(&headers_with("application/json; charset=utf-8")));
        assert!(is_json_content_type(&headers_with("application/problem+json")));
        assert!(!is_json_content_type(&headers_with("text/plain")));
        assert!(!is_json_content_type(&HeaderMap::new()));
    }

    #[test]
    fn test_decode_by_content_type() {
        let json = ResponseBody::decode(&headers_with("application/json"), br#"{"id":1}"#).unwrap();
        assert_eq!(json, ResponseBody::Json(json!({"id": 1})));

        let text = ResponseBody::decode(&headers_with("text/plain"), br#"{"id":1}"#).unwrap();
        assert_eq!(text, ResponseBody::Text(r#"{"id":1}"#.to_string()));

        let missing = ResponseBody::decode(&HeaderMap::new(), b"plain").unwrap();
        assert_eq!(missing, ResponseBody::Text("plain".to_string()));
    }

    #[test]
    fn test_decode_invalid_utf8_text_is_lossy() {
        let body = ResponseBody::decode(
            &headers_with("text/html; charset=iso-8859-1"),
            b"Passerelle d\xe9faillante",
        )
        .unwrap();
        assert_eq!(body, ResponseBody::Text("Passerelle d\u{FFFD}faillante".to_string()));
    }

    #[test]
    fn test_decode_malformed_json() {
        assert!(ResponseBody::decode(&headers_with("application/json"), b"not json").is_err());
    }

    #[test]
    fn test_to_typed() {
        #[derive(Deserialize, Debug, PartialEq)]
        struct User {
            id: u32,
            name: String,
        }

        let user: User = ResponseBody::Json(json!({"id": 1, "name": "Test User"}))
            .to_typed()
            .unwrap();
        assert_eq!(user, User { id: 1, name: "Test User".into() });

        let text: String = ResponseBody::Text("ok".into()).to_typed().unwrap();
        assert_eq!(text, "ok");

        let value: Value = ResponseBody::Text("ok".into()).to_typed().unwrap();
        assert_eq!(value, json!("ok"));

        ResponseBody::Text(String::new()).to_typed::<()>().unwrap();
        ResponseBody::Text(String::new()).to_typed::<Option<u32>>().unwrap();

        let empty: String = ResponseBody::Text(String::new()).to_typed().unwrap();
        assert_eq!(empty, "");

        assert!(ResponseBody::Text("ok".into()).to_typed::<User>().is_err());
    }

    #[test]
    fn test_response_helpers() {
        let response = Response::new(
            42,
            StatusCode::OK,
            headers_with("application/json"),
            Duration::from_millis(5),
            3,
        );
        assert!(response.was_retried());
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(*response, 42);

        let mapped = response.map(|n| n.to_string());
        assert_eq!(mapped.data, "42");
        assert_eq!(mapped.attempts, 3);
    }
}
