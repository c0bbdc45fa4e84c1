//! OAuth 1.0a request signing (HMAC-SHA1) for the BrickLink Store API.
//!
//! BrickLink issues both the consumer credentials and a long-lived access
//! token from the store's API settings page, so there is no token dance:
//! every request is simply signed with all four secrets.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// The four BrickLink API secrets.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: SecretString,
    pub token_value: String,
    pub token_secret: SecretString,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[REDACTED]")
            .field("token_value", &self.token_value)
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Percent-encode per RFC 3986 (everything but `A-Z a-z 0-9 - . _ ~`).
#[must_use]
pub fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// A random alphanumeric nonce.
#[must_use]
pub fn nonce() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

impl OAuthCredentials {
    /// Build the `Authorization` header value for a request with a fresh
    /// nonce and the current time.
    #[must_use]
    pub fn authorization_header(&self, method: &str, url: &str, query: &[(String, String)]) -> String {
        self.authorization_header_with(method, url, query, &nonce(), chrono::Utc::now().timestamp())
    }

    /// Build the `Authorization` header value with an explicit nonce and timestamp.
    ///
    /// `url` must not contain a query string; query parameters are passed
    /// separately so they can be included in the signature.
    #[must_use]
    pub fn authorization_header_with(
        &self,
        method: &str,
        url: &str,
        query: &[(String, String)],
        nonce: &str,
        timestamp: i64,
    ) -> String {
        let timestamp = timestamp.to_string();
        let oauth_params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_token", self.token_value.as_str()),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_version", "1.0"),
        ];

        let all_params = query
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(oauth_params.iter().copied());
        let base = signature_base_string(method, url, all_params);
        let signature = self.sign(&base);

        let mut header = String::from("OAuth realm=\"\"");
        for (key, value) in oauth_params
            .iter()
            .copied()
            .chain(std::iter::once(("oauth_signature", signature.as_str())))
        {
            header.push_str(&format!(", {key}=\"{}\"", encode(value)));
        }
        header
    }

    fn sign(&self, base: &str) -> String {
        let key = format!(
            "{}&{}",
            encode(self.consumer_secret.expose_secret()),
            encode(self.token_secret.expose_secret())
        );
        // HMAC accepts keys of any length
        let Ok(mut mac) = HmacSha1::new_from_slice(key.as_bytes()) else {
            return String::new();
        };
        mac.update(base.as_bytes());
        BASE64.encode(mac.finalize().into_bytes())
    }
}

/// `METHOD&enc(url)&enc(normalized params)`, params encoded then sorted by key and value.
fn signature_base_string<'a>(
    method: &str,
    url: &str,
    params: impl Iterator<Item = (&'a str, &'a str)>,
) -> String {
    let mut encoded: Vec<(String, String)> = params.map(|(k, v)| (encode(k), encode(v))).collect();
    encoded.sort();
    let normalized = encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        encode(url),
        encode(&normalized)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://api.bricklink.com/api/store/v1/inventories";

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            consumer_key: "ck-123".to_string(),
            consumer_secret: SecretString::from("cs secret/+"),
            token_value: "tv-456".to_string(),
            token_secret: SecretString::from("ts&secret"),
        }
    }

    fn query() -> Vec<(String, String)> {
        vec![
            ("item_type".to_string(), "MINIFIG".to_string()),
            ("status".to_string(), "Y".to_string()),
        ]
    }

    #[test]
    fn test_encode_is_rfc3986() {
        assert_eq!(encode("a b+c/~d-e._"), "a%20b%2Bc%2F~d-e._");
    }

    #[test]
    fn test_signature_base_string_sorts_and_encodes() {
        let params = [("status", "Y"), ("item_type", "MINIFIG"), ("oauth_nonce", "n")];
        let base = signature_base_string("get", URL, params.into_iter());
        assert_eq!(
            base,
            "GET&https%3A%2F%2Fapi.bricklink.com%2Fapi%2Fstore%2Fv1%2Finventories\
             &item_type%3DMINIFIG%26oauth_nonce%3Dn%26status%3DY"
        );
    }

    #[test]
    fn test_known_signature_vector() {
        let header = credentials().authorization_header_with(
            "GET",
            URL,
            &query(),
            "abc123nonce",
            1_700_000_000,
        );
        assert!(header.starts_with("OAuth realm=\"\""));
        assert!(header.contains("oauth_consumer_key=\"ck-123\""));
        assert!(header.contains("oauth_signature_method=\"HMAC-SHA1\""));
        assert!(header.contains("oauth_timestamp=\"1700000000\""));
        assert!(header.contains("oauth_signature=\"6hBIQ9pYLp%2B5ipduPJbbhhA0vAo%3D\""));
    }

    #[test]
    fn test_nonce_is_random_alphanumeric() {
        let a = nonce();
        let b = nonce();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", credentials());
        assert!(!debug.contains("cs secret"));
        assert!(!debug.contains("ts&secret"));
    }
}
