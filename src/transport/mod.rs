pub mod http;

use serde::Serialize;
use url::form_urlencoded;

use crate::error::{Error, Result};

pub use http::HttpTransport;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_FORM: &str = "application/x-www-form-urlencoded";

/// One call against the Keystone API, relative to the transport's base URL.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    /// Empty means GET.
    pub method: String,
    /// `None` selects [`default_headers`].
    pub headers: Option<Vec<(String, String)>>,
    pub endpoint: String,
    /// Raw `key=value&key=value` string; validated and re-encoded by [`encode_query`].
    pub query: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn get(endpoint: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    pub fn post_json<T: Serialize>(endpoint: impl Into<String>, payload: &T) -> Result<Self> {
        let body = serde_json::to_vec(payload)
            .map_err(|e| Error::RequestBuild(format!("serialize json body: {e}")))?;
        Ok(Self {
            method: "POST".to_string(),
            endpoint: endpoint.into(),
            body: Some(body),
            ..Default::default()
        })
    }

    pub fn post_form(endpoint: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        let mut form = form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            form.append_pair(key, value);
        }
        Self {
            method: "POST".to_string(),
            headers: Some(vec![
                ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
                ("Content-Type".to_string(), CONTENT_TYPE_FORM.to_string()),
            ]),
            endpoint: endpoint.into(),
            body: Some(form.finish().into_bytes()),
            ..Default::default()
        }
    }

    /// Replaces the header set with a bearer authorization and a JSON accept.
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers = Some(vec![
            ("Authorization".to_string(), format!("Bearer {token}")),
            ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
        ]);
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn effective_method(&self) -> String {
        normalize_method(&self.method)
    }

    pub fn effective_headers(&self) -> Vec<(String, String)> {
        self.headers.clone().unwrap_or_else(default_headers)
    }
}

/// Raw exchange result. Any status code is returned as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Issues a single request and buffers the whole response.
pub trait Transport {
    fn request(&self, request: ApiRequest) -> Result<ApiResponse>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).request(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn request(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).request(request)
    }
}

pub fn normalize_method(method: &str) -> String {
    let method = method.trim();
    if method.is_empty() {
        "GET".to_string()
    } else {
        method.to_uppercase()
    }
}

pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Accept".to_string(), CONTENT_TYPE_JSON.to_string()),
        ("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string()),
    ]
}

/// Parses a `key=value&key=value` string and re-encodes it with keys sorted.
/// `;` separators and malformed percent escapes are rejected.
pub fn encode_query(raw: &str) -> Result<String> {
    let invalid = |reason: String| Error::InvalidQuery {
        query: raw.to_string(),
        reason,
    };

    let mut pairs: Vec<(String, String)> = Vec::new();
    for segment in raw.split('&') {
        if segment.is_empty() {
            continue;
        }
        if segment.contains(';') {
            return Err(invalid("semicolon separators are not allowed".to_string()));
        }
        if let Some(pos) = find_bad_escape(segment) {
            return Err(invalid(format!("malformed percent escape at `{}`", &segment[pos..])));
        }
        if let Some((key, value)) = form_urlencoded::parse(segment.as_bytes()).next() {
            pairs.push((key.into_owned(), value.into_owned()));
        }
    }

    // stable: repeated keys keep their order
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut out = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &pairs {
        out.append_pair(key, value);
    }
    Ok(out.finish())
}

fn find_bad_escape(segment: &str) -> Option<usize> {
    let bytes = segment.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let ok = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !ok {
                return Some(i);
            }
            i += 3;
        } else {
            i += 1;
        }
    }
    None
}

/// `base + "/" + endpoint`, plus `?query` when a non-empty query is given.
pub fn build_url(base_url: &str, endpoint: &str, query: Option<&str>) -> Result<String> {
    let mut url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    );
    if let Some(raw) = query.filter(|q| !q.is_empty()) {
        let encoded = encode_query(raw)?;
        if !encoded.is_empty() {
            url.push('?');
            url.push_str(&encoded);
        }
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_defaults_to_get_and_is_uppercased() {
        assert_eq!(normalize_method(""), "GET");
        assert_eq!(normalize_method("post"), "POST");
        assert_eq!(normalize_method("Delete"), "DELETE");
    }

    #[test]
    fn missing_headers_fall_back_to_json_defaults() {
        let req = ApiRequest {
            endpoint: "x".to_string(),
            ..Default::default()
        };
        let headers = req.effective_headers();
        assert!(headers.contains(&("Accept".to_string(), "application/json".to_string())));
        assert!(headers.contains(&("Content-Type".to_string(), "application/json".to_string())));
        assert_eq!(req.effective_method(), "GET");
    }

    #[test]
    fn bearer_replaces_headers() {
        let req = ApiRequest::get("adminservice/keystone/v1/group").with_bearer("tok");
        let headers = req.effective_headers();
        assert_eq!(headers[0], ("Authorization".to_string(), "Bearer tok".to_string()));
        assert!(!headers.iter().any(|(k, _)| k == "Content-Type"));
    }

    #[test]
    fn form_body_is_url_encoded() {
        let req = ApiRequest::post_form(
            "authserver/token",
            &[("grant_type", "password"), ("sessiontoken", "a b/c")],
        );
        assert_eq!(
            String::from_utf8(req.body.unwrap()).unwrap(),
            "grant_type=password&sessiontoken=a+b%2Fc"
        );
    }

    #[test]
    fn build_url_joins_base_and_endpoint() {
        let url = build_url("https://api.example.com/", "authserver/token", None).unwrap();
        assert_eq!(url, "https://api.example.com/authserver/token");

        let url = build_url("https://api.example.com", "x", Some("")).unwrap();
        assert_eq!(url, "https://api.example.com/x");
    }

    #[test]
    fn build_url_reencodes_query_sorted() {
        let url = build_url(
            "https://api.example.com",
            "adminservice/keystone/v1/group",
            Some("groupName=C3PO+-+Finance&a=1"),
        )
        .unwrap();
        assert_eq!(
            url,
            "https://api.example.com/adminservice/keystone/v1/group?a=1&groupName=C3PO+-+Finance"
        );
    }

    #[test]
    fn repeated_keys_keep_value_order() {
        assert_eq!(encode_query("b=2&a=x&b=1").unwrap(), "a=x&b=2&b=1");
    }

    #[test]
    fn malformed_queries_are_rejected() {
        assert!(matches!(encode_query("a=%zz"), Err(Error::InvalidQuery { .. })));
        assert!(matches!(encode_query("a=1;b=2"), Err(Error::InvalidQuery { .. })));
        assert!(matches!(encode_query("a=%4"), Err(Error::InvalidQuery { .. })));
    }

    #[test]
    fn response_status_helpers() {
        let resp = ApiResponse::new(401, "denied");
        assert!(!resp.is_ok());
        assert_eq!(resp.text(), "denied");
    }
}
