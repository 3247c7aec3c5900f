//! Request signing (HMAC-SHA256 over client id, token, time, nonce and a
//! canonical request string).

use ring::{digest, hmac};

pub(crate) const SIGN_METHOD: &str = "HMAC-SHA256";

fn lower_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

fn upper_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{byte:02X}")).collect()
}

/// `METHOD \n sha256(body) \n \n path`, with no signed headers.
pub(crate) fn string_to_sign(method: &str, body: &[u8], path_and_query: &str) -> String {
    let body_hash = digest::digest(&digest::SHA256, body);
    format!("{method}\n{}\n\n{path_and_query}", lower_hex(body_hash.as_ref()))
}

/// Uppercase hex signature.
///
/// Token requests are signed without an access token; business requests
/// include the current one.
pub(crate) fn sign(
    access_key: &str,
    client_id: &str,
    access_token: Option<&str>,
    t: &str,
    nonce: &str,
    string_to_sign: &str,
) -> String {
    let key = hmac::Key::new(hmac::HMAC_SHA256, access_key.as_bytes());
    let mut ctx = hmac::Context::with_key(&key);
    ctx.update(client_id.as_bytes());
    if let Some(token) = access_token {
        ctx.update(token.as_bytes());
    }
    ctx.update(t.as_bytes());
    ctx.update(nonce.as_bytes());
    ctx.update(string_to_sign.as_bytes());
    upper_hex(ctx.sign().as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn should_hash_empty_body_into_string_to_sign() {
        let sts = string_to_sign("GET", b"", "/v1.0/token?grant_type=1");

        assert_eq!(sts, format!("GET\n{EMPTY_SHA256}\n\n/v1.0/token?grant_type=1"));
    }

    #[test]
    fn should_hash_json_body() {
        let sts = string_to_sign("POST", br#"{"a":1}"#, "/v1.0/x");

        assert!(sts.contains("015abd7f5cc57a2dd94b7590f04ad8084273905ee33ec5cebeae62276a97f862"));
    }

    #[test]
    fn should_sign_token_request_without_access_token() {
        let sts = string_to_sign("GET", b"", "/v1.0/token?grant_type=1");

        let signature = sign("secret-key", "client-id", None, "1700000000000", "nonce-1", &sts);

        assert_eq!(
            signature,
            "986F5A0AD70AEA807AC712C8877CC3E31333B15970F58888A109C540B654DE77"
        );
    }

    #[test]
    fn should_sign_business_request_with_access_token() {
        let sts = string_to_sign("GET", b"", "/v1.0/devices/bf01/status");

        let signature = sign(
            "secret-key",
            "client-id",
            Some("token-abc"),
            "1700000000000",
            "nonce-1",
            &sts,
        );

        assert_eq!(
            signature,
            "2D41E9ACC754F4A9BCB478CBD4095E01133200351CEA75046779D6464337460F"
        );
    }
}
