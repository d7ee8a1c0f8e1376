//! Cookie bridge for the WebSocket handshake.
//!
//! The adapter does not store cookies. The host supplies a [`CookieStore`]
//! backed by its own cookie jar; the transport asks it for the `Cookie`
//! header of the handshake request and hands back any `Set-Cookie` headers
//! from the handshake response.

use url::Url;

/// Host-owned cookie jar consulted during the handshake.
pub trait CookieStore: Send + Sync + 'static {
    /// Returns the `Cookie` header value for a request to `url`, if any.
    fn cookie_header(&self, url: &Url) -> Option<String>;

    /// Records one `Set-Cookie` header received from `url`.
    fn store_set_cookie(&self, url: &Url, header: &str);
}
