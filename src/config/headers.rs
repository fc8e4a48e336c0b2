//! HTTP method, header and header-value constants.

/// `GET` request method
pub const METHOD_GET: &str = "GET";
/// `HEAD` request method
pub const METHOD_HEAD: &str = "HEAD";
/// `POST` request method
pub const METHOD_POST: &str = "POST";
/// `PUT` request method
pub const METHOD_PUT: &str = "PUT";
/// `PATCH` request method
pub const METHOD_PATCH: &str = "PATCH";
/// `DELETE` request method
pub const METHOD_DELETE: &str = "DELETE";
/// `CONNECT` request method
pub const METHOD_CONNECT: &str = "CONNECT";
/// `OPTIONS` request method
pub const METHOD_OPTIONS: &str = "OPTIONS";
/// `TRACE` request method
pub const METHOD_TRACE: &str = "TRACE";

// Header names the engine writes or reads itself
/// `Host` header name
pub const HEADER_HOST: &str = "Host";
/// `Cookie` header name
pub const HEADER_COOKIE: &str = "Cookie";
/// `Content-Type` header name
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
/// `Content-Length` header name
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
/// `User-Agent` header name
pub const HEADER_USER_AGENT: &str = "User-Agent";
/// `Authorization` header name
pub const HEADER_AUTHORIZATION: &str = "Authorization";
/// Redirect target, looked up in both case forms.
pub const HEADER_LOCATION: &str = "Location";
/// Lower-case form of [`HEADER_LOCATION`]
pub const HEADER_LOCATION_LOWER: &str = "location";

// Content types
/// `application/json`
pub const MIME_APPLICATION_JSON: &str = "application/json";
/// `application/json; charset=utf-8`
pub const MIME_APPLICATION_JSON_CHARSET_UTF8: &str = "application/json; charset=utf-8";
/// `application/xml`
pub const MIME_APPLICATION_XML: &str = "application/xml";
/// `text/xml`
pub const MIME_TEXT_XML: &str = "text/xml";
/// `application/x-www-form-urlencoded`
pub const MIME_APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
/// `multipart/form-data`
pub const MIME_MULTIPART_FORM: &str = "multipart/form-data";
/// `text/plain`
pub const MIME_TEXT_PLAIN: &str = "text/plain";
/// `text/html`
pub const MIME_TEXT_HTML: &str = "text/html";
/// `application/octet-stream`
pub const MIME_OCTET_STREAM: &str = "application/octet-stream";

/// User-Agent sent when a request sets none and default user agents are enabled.
pub const DEFAULT_USER_AGENT: &str = concat!("httpx/", env!("CARGO_PKG_VERSION"), " (hyper-based)");

// Common browser user agents, opt-in through `Request::set_user_agent`
/// Desktop Chrome on Windows
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.5735.199 Safari/537.36";
/// Desktop Firefox on Windows
pub const FIREFOX_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:114.0) Gecko/20100101 Firefox/114.0";
/// Safari on macOS
pub const SAFARI_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5.1 Safari/605.1.15";
/// Samsung Internet on Android
pub const ANDROID_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 13; SM-G998B) AppleWebKit/537.36 (KHTML, like Gecko) SamsungBrowser/21.0 Chrome/114.0.5735.199 Mobile Safari/537.36";
