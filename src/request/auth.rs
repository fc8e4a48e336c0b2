//! Request authentication helpers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::config::HEADER_AUTHORIZATION;

/// Credentials for HTTP basic authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    #[allow(missing_docs)]
    pub username: String,
    #[allow(missing_docs)]
    pub password: String,
}

impl BasicAuth {
    /// Returns the header name and value carrying these credentials.
    pub fn header(&self) -> (&'static str, String) {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        (HEADER_AUTHORIZATION, format!("Basic {encoded}"))
    }
}

impl std::fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicAuth")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}
