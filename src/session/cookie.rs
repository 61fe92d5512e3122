//! Session cookie attributes, `Set-Cookie` rendering and `Cookie` parsing.
//!
//! # Attribute Policy
//! ```text
//!               HttpOnly  Secure  SameSite  Max-Age  Path
//! production    yes       yes     None      TTL      /
//! otherwise     yes       no      Lax       TTL      /
//! ```
//!
//! `SameSite=None` and `Secure` are one variant of [`CookieScope`]; there is
//! no way to ask for one without the other.

use axum::http::header::{HeaderMap, COOKIE};
use axum::http::HeaderValue;
use chrono::{DateTime, Duration, Utc};

/// The coupled `SameSite`/`Secure` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieScope {
    /// `SameSite=None; Secure`: sent on cross-site requests over HTTPS.
    CrossSite,
    /// `SameSite=Lax`, not secure: local development.
    SameSiteLax,
}

impl CookieScope {
    pub fn same_site(self) -> &'static str {
        match self {
            CookieScope::CrossSite => "None",
            CookieScope::SameSiteLax => "Lax",
        }
    }

    pub fn secure(self) -> bool {
        matches!(self, CookieScope::CrossSite)
    }
}

/// How the session cookie is written.
#[derive(Debug, Clone)]
pub struct CookiePolicy {
    name: String,
    scope: CookieScope,
    max_age: Duration,
}

impl CookiePolicy {
    /// Pick attributes for the deployment environment.
    pub fn for_environment(name: impl Into<String>, production: bool, max_age: Duration) -> Self {
        let scope = if production {
            CookieScope::CrossSite
        } else {
            CookieScope::SameSiteLax
        };
        Self { name: name.into(), scope, max_age }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> CookieScope {
        self.scope
    }

    /// `Set-Cookie` value storing `value` until `expires`.
    pub fn set_cookie(&self, value: &str, expires: DateTime<Utc>) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{}={}; Path=/; Expires={}; Max-Age={}; HttpOnly",
            self.name,
            value,
            http_date(expires),
            self.max_age.num_seconds(),
        );
        self.push_scope(&mut cookie);
        HeaderValue::from_str(&cookie).ok()
    }

    /// `Set-Cookie` value telling the client to drop the cookie.
    pub fn clear_cookie(&self) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{}=; Path=/; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=0; HttpOnly",
            self.name,
        );
        self.push_scope(&mut cookie);
        HeaderValue::from_str(&cookie).ok()
    }

    fn push_scope(&self, cookie: &mut String) {
        if self.scope.secure() {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.scope.same_site());
    }

    /// The raw session cookie value sent by the client, if any.
    ///
    /// Malformed `Cookie` headers are ignored rather than rejected.
    pub fn read<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .map(|(_, value)| value.trim().trim_matches('"'))
            .filter(|value| !value.is_empty())
    }
}

fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn attributes(value: &HeaderValue) -> Vec<String> {
        value.to_str().unwrap().split("; ").map(str::to_string).collect()
    }

    #[test]
    fn production_cookie_is_cross_site_and_secure() {
        let policy = CookiePolicy::for_environment("sid", true, Duration::hours(24));
        let expires = Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap();
        let attrs = attributes(&policy.set_cookie("abc.def", expires).unwrap());

        assert_eq!(attrs[0], "sid=abc.def");
        assert!(attrs.contains(&"Path=/".to_string()));
        assert!(attrs.contains(&"Expires=Wed, 02 Jan 2030 03:04:05 GMT".to_string()));
        assert!(attrs.contains(&"Max-Age=86400".to_string()));
        assert!(attrs.contains(&"HttpOnly".to_string()));
        assert!(attrs.contains(&"Secure".to_string()));
        assert!(attrs.contains(&"SameSite=None".to_string()));
    }

    #[test]
    fn development_cookie_is_lax_and_not_secure() {
        let policy = CookiePolicy::for_environment("sid", false, Duration::hours(24));
        let attrs = attributes(&policy.set_cookie("v", Utc::now()).unwrap());

        assert!(attrs.contains(&"HttpOnly".to_string()));
        assert!(attrs.contains(&"SameSite=Lax".to_string()));
        assert!(!attrs.contains(&"Secure".to_string()));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let policy = CookiePolicy::for_environment("sid", true, Duration::hours(24));
        let attrs = attributes(&policy.clear_cookie().unwrap());
        assert_eq!(attrs[0], "sid=");
        assert!(attrs.contains(&"Max-Age=0".to_string()));
        assert!(attrs.contains(&"Secure".to_string()));
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let policy = CookiePolicy::for_environment("sid", false, Duration::hours(1));
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark; sid=tok.sig"));
        assert_eq!(policy.read(&headers), Some("tok.sig"));

        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("sid=\"quoted\""));
        assert_eq!(policy.read(&headers), Some("quoted"));
    }

    #[test]
    fn missing_or_malformed_cookie_reads_as_none() {
        let policy = CookiePolicy::for_environment("sid", false, Duration::hours(1));
        assert_eq!(policy.read(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("sid; ;=; sidx=1; sid="));
        assert_eq!(policy.read(&headers), None);
    }
}
