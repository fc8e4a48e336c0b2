//! Pre-execution sync: turns the builder state into an `OutgoingRequest`.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use percent_encoding::percent_decode_str;
use url::form_urlencoded;
use url::Url;

use super::RequestState;
use crate::config::{
    HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE, HEADER_COOKIE, HEADER_HOST, HEADER_USER_AGENT,
    MIME_APPLICATION_FORM,
};
use crate::error_handling::Error;
use crate::transport::{host_header_value, request_target, set_header, OutgoingRequest, WireOptions};

/// Parses `raw` into an absolute `http`/`https` URL.
pub(super) fn parse_http_url(raw: &str) -> Result<Url, Error> {
    let url = Url::parse(raw).map_err(|source| Error::UrlParse {
        url: raw.to_string(),
        source,
    })?;
    check_scheme(&url, raw)?;
    Ok(url)
}

pub(super) fn check_scheme(url: &Url, raw: &str) -> Result<(), Error> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::UnsupportedScheme {
            url: raw.to_string(),
            scheme: other.to_string(),
        }),
    }
}

/// Merges the URL's own query parameters with the builder's, builder keys winning.
///
/// Works on a copy: the builder's parameters are never modified. Pairs taken
/// from the URL are kept as raw bytes, so escapes that are not valid UTF-8
/// are re-sent unchanged.
fn merge_query(url: &mut Url, params: &BTreeMap<String, Vec<String>>) {
    let mut merged: BTreeMap<Vec<u8>, Vec<Vec<u8>>> = BTreeMap::new();
    for (key, value) in raw_query_pairs(url.query().unwrap_or_default()) {
        merged.entry(key).or_default().push(value);
    }
    for (key, values) in params {
        merged.insert(
            key.as_bytes().to_vec(),
            values.iter().map(|v| v.as_bytes().to_vec()).collect(),
        );
    }

    if merged.is_empty() {
        url.set_query(None);
        return;
    }
    let query = merged
        .iter()
        .flat_map(|(k, vs)| {
            vs.iter()
                .map(move |v| format!("{}={}", encode_component(k), encode_component(v)))
        })
        .collect::<Vec<_>>()
        .join("&");
    url.set_query(Some(&query));
}

/// Splits a raw query into decoded `(key, value)` byte pairs.
fn raw_query_pairs(query: &str) -> impl Iterator<Item = (Vec<u8>, Vec<u8>)> + '_ {
    query.split('&').filter(|pair| !pair.is_empty()).map(|pair| {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        (decode_component(key), decode_component(value))
    })
}

fn decode_component(raw: &str) -> Vec<u8> {
    percent_decode_str(&raw.replace('+', " ")).collect()
}

fn encode_component(bytes: &[u8]) -> String {
    form_urlencoded::byte_serialize(bytes).collect()
}

fn encode_form(form: &BTreeMap<String, Vec<String>>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, values) in form {
        for value in values {
            serializer.append_pair(key, value);
        }
    }
    serializer.finish()
}

fn validate_headers(headers: &[(String, String)]) -> Result<(), Error> {
    for (name, value) in headers {
        if HeaderName::from_bytes(name.as_bytes()).is_err() || HeaderValue::from_str(value).is_err()
        {
            return Err(Error::InvalidHeader { name: name.clone() });
        }
    }
    Ok(())
}

/// Builds the outgoing request for one call and records it on the state.
///
/// Also refreshes the state's URL components and computed content length.
pub(super) fn prepare(
    state: &mut RequestState,
    raw_url: &str,
    method: &str,
    wire: &WireOptions,
) -> Result<OutgoingRequest, Error> {
    let method =
        Method::from_bytes(method.as_bytes()).map_err(|_| Error::InvalidMethod(method.to_string()))?;

    let mut url = parse_http_url(raw_url)?;
    merge_query(&mut url, &state.query_params);
    state.set_url_components(&url);

    let mut headers = state.headers.clone();
    if !headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(HEADER_HOST)) {
        headers.insert(0, (HEADER_HOST.to_string(), host_header_value(&url)));
    }

    if !state.cookies.is_empty() {
        let cookie = state
            .cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ");
        set_header(&mut headers, HEADER_COOKIE, cookie);
    }

    if !state.content_type.is_empty() {
        set_header(&mut headers, HEADER_CONTENT_TYPE, state.content_type.clone());
    }

    let body = match &state.form_data {
        Some(form) => {
            if state.content_type.is_empty() {
                set_header(&mut headers, HEADER_CONTENT_TYPE, MIME_APPLICATION_FORM.to_string());
            }
            Bytes::from(encode_form(form))
        }
        None => state.body.clone(),
    };
    if state.form_data.is_some() || !body.is_empty() {
        state.content_length = Some(body.len());
        set_header(&mut headers, HEADER_CONTENT_LENGTH, body.len().to_string());
    }

    if !state.user_agent.is_empty() {
        set_header(&mut headers, HEADER_USER_AGENT, state.user_agent.clone());
    } else if let Some(default) = wire.default_user_agent {
        if !headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(HEADER_USER_AGENT))
        {
            set_header(&mut headers, HEADER_USER_AGENT, default.to_string());
        }
    }

    if let Some(auth) = &state.basic_auth {
        let (name, value) = auth.header();
        set_header(&mut headers, name, value);
    }

    validate_headers(&headers)?;

    let request = OutgoingRequest {
        method,
        request_target: request_target(&url, Some(raw_url), wire.normalize_path),
        url,
        headers,
        body,
    };
    state.original_request = Some(request.clone());
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_handling::ErrorKind;
    use crate::request::auth::BasicAuth;

    fn wire() -> WireOptions {
        WireOptions {
            normalize_header_names: false,
            normalize_path: false,
            default_user_agent: None,
        }
    }

    fn params(pairs: &[(&str, &str)]) -> BTreeMap<String, Vec<String>> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), vec![v.to_string()]))
            .collect()
    }

    #[test]
    fn test_merge_query_builder_wins() {
        let mut url = Url::parse("http://a.test/p?a=1&b=2&b=3").unwrap();
        merge_query(&mut url, &params(&[("a", "9"), ("c", "4")]));
        assert_eq!(url.query(), Some("a=9&b=2&b=3&c=4"));
    }

    #[test]
    fn test_merge_query_keeps_raw_bytes() {
        let mut url = Url::parse("http://a.test/p?a=%FF&s=x+y&e=%2B").unwrap();
        merge_query(&mut url, &params(&[("b", "1")]));
        assert_eq!(url.query(), Some("a=%FF&b=1&e=%2B&s=x+y"));
    }

    #[test]
    fn test_merge_query_empty_drops_question_mark() {
        let mut url = Url::parse("http://a.test/p?").unwrap();
        merge_query(&mut url, &BTreeMap::new());
        assert_eq!(url.as_str(), "http://a.test/p");
    }

    #[test]
    fn test_prepare_writes_all_builder_fields() {
        let mut state = RequestState::default();
        state.headers.push(("X-Trace".into(), "1".into()));
        state.cookies.insert("b".into(), "2".into());
        state.cookies.insert("a".into(), "1".into());
        state.content_type = "application/json".into();
        state.body = Bytes::from_static(b"{\"k\":1}");
        state.user_agent = "agent/1.0".into();
        state.basic_auth = Some(BasicAuth {
            username: "u".into(),
            password: "p".into(),
        });
        state.query_params = params(&[("q", "x")]);

        let request = prepare(&mut state, "http://a.test:8080/api?z=0", "POST", &wire()).unwrap();

        assert_eq!(request.method, Method::POST);
        assert_eq!(request.request_target, "/api?q=x&z=0");
        assert_eq!(request.header("Host"), Some("a.test:8080"));
        assert_eq!(request.header("x-trace"), Some("1"));
        assert_eq!(request.header("Cookie"), Some("a=1; b=2"));
        assert_eq!(request.header("Content-Type"), Some("application/json"));
        assert_eq!(request.header("Content-Length"), Some("7"));
        assert_eq!(request.header("User-Agent"), Some("agent/1.0"));
        assert_eq!(request.header("Authorization"), Some("Basic dTpw"));
        assert_eq!(&request.body[..], b"{\"k\":1}");

        assert_eq!(state.content_length, Some(7));
        assert_eq!(state.host_port, "a.test:8080");
        assert_eq!(state.hostname, "a.test");
        assert_eq!(state.port, "8080");
        assert_eq!(state.path, "/api");
        assert_eq!(state.original_request.as_ref(), Some(&request));
        // builder params are not polluted by the URL's own
        assert_eq!(state.query_params, params(&[("q", "x")]));
    }

    #[test]
    fn test_form_data_wins_over_body() {
        let mut state = RequestState::default();
        state.body = Bytes::from_static(b"ignored");
        state.form_data = Some(params(&[("name", "a b"), ("id", "7")]));

        let request = prepare(&mut state, "http://a.test/form", "POST", &wire()).unwrap();
        assert_eq!(&request.body[..], b"id=7&name=a+b");
        assert_eq!(request.header("Content-Length"), Some("13"));
        assert_eq!(request.header("Content-Type"), Some(MIME_APPLICATION_FORM));
    }

    #[test]
    fn test_no_body_sends_no_content_length() {
        let mut state = RequestState::default();
        state.content_length = Some(42);
        let request = prepare(&mut state, "http://a.test/", "GET", &wire()).unwrap();
        assert_eq!(request.header("Content-Length"), None);
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_default_user_agent_only_when_enabled() {
        let mut state = RequestState::default();
        let request = prepare(&mut state, "http://a.test/", "GET", &wire()).unwrap();
        assert_eq!(request.header("User-Agent"), None);

        let with_default = WireOptions {
            default_user_agent: Some("httpx-test"),
            ..wire()
        };
        let request = prepare(&mut state, "http://a.test/", "GET", &with_default).unwrap();
        assert_eq!(request.header("User-Agent"), Some("httpx-test"));
    }

    #[test]
    fn test_path_normalization_switch() {
        let mut state = RequestState::default();
        let raw = "http://a.test//x/../y";
        let request = prepare(&mut state, raw, "GET", &wire()).unwrap();
        assert_eq!(request.request_target, "//x/../y");

        let normalized = WireOptions {
            normalize_path: true,
            ..wire()
        };
        let request = prepare(&mut state, raw, "GET", &normalized).unwrap();
        assert_eq!(request.request_target, "/y");
    }

    #[test]
    fn test_prepare_rejections() {
        let mut state = RequestState::default();
        let err = prepare(&mut state, "http://a.test/", "GE T", &wire()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMethod);

        let err = prepare(&mut state, "http://[bad", "GET", &wire()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UrlParse);

        let err = prepare(&mut state, "ftp://a.test/file", "GET", &wire()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedScheme);

        state.headers.push(("Bad Header".into(), "v".into()));
        let err = prepare(&mut state, "http://a.test/", "GET", &wire()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidHeader);
    }
}
