use hmac::{Hmac, Mac};
use md5::Md5;
use secrecy::{ExposeSecret, SecretString};

use crate::error::Error;

/// SOAP namespace every HNAP action is qualified with.
pub const SOAP_NAMESPACE: &str = "http://purenetworks.com/HNAP1/";

/// Signing key the firmware expects before a session exists.
pub const ANONYMOUS_KEY: &str = "withoutloginkey";

type HmacMd5 = Hmac<Md5>;

/// Authenticated HNAP session material.
///
/// `uid` is the session cookie issued by the login challenge; the private
/// key is derived from the password and signs every subsequent request.
/// Both travel as cookies, but the struct is passed explicitly into every
/// call instead of living in a shared cookie jar, so whoever owns the
/// session decides when it is replaced.
#[derive(Debug, Clone)]
pub struct HnapSession {
    uid: String,
    private_key: SecretString,
}

impl HnapSession {
    pub fn new(uid: impl Into<String>, private_key: SecretString) -> Self {
        Self {
            uid: uid.into(),
            private_key,
        }
    }

    /// The device-issued session cookie value.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub(crate) fn signing_key(&self) -> &str {
        self.private_key.expose_secret()
    }

    /// `Cookie` header value carrying both session cookies.
    pub(crate) fn cookie_header(&self) -> String {
        format!(
            "uid={}; PrivateKey={}",
            self.uid,
            self.private_key.expose_secret()
        )
    }
}

/// Upper-case hex HMAC-MD5, the only digest the firmware speaks.
pub fn hmac_md5_upper(key: &str, data: &str) -> Result<String, Error> {
    let mut mac =
        HmacMd5::new_from_slice(key.as_bytes()).map_err(|e| Error::Signing(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(hex::encode_upper(mac.finalize().into_bytes()))
}

/// Millisecond timestamp in the range the firmware accepts.
pub fn hnap_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis() % 2_000_000_000_000
}

/// Fully qualified `SOAPAction` header value for an action.
pub fn soap_action(action: &str) -> String {
    format!("{SOAP_NAMESPACE}{action}")
}

/// `HNAP_AUTH` header value: `<HMAC(key, ts + SOAPAction)> <ts>`.
pub fn hnap_auth_header(signing_key: &str, action: &str, timestamp: i64) -> Result<String, Error> {
    let digest = hmac_md5_upper(signing_key, &format!("{timestamp}{}", soap_action(action)))?;
    Ok(format!("{digest} {timestamp}"))
}

/// Derive the session private key from the login challenge.
pub fn derive_private_key(
    public_key: &str,
    password: &SecretString,
    challenge: &str,
) -> Result<SecretString, Error> {
    let key = format!("{public_key}{}", password.expose_secret());
    hmac_md5_upper(&key, challenge).map(SecretString::from)
}

/// Compute the `LoginPassword` answer for the second login phase.
pub fn login_password(private_key: &SecretString, challenge: &str) -> Result<String, Error> {
    hmac_md5_upper(private_key.expose_secret(), challenge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_md5_matches_rfc2104_vector() {
        // RFC 2104 test case 2.
        assert_eq!(
            hmac_md5_upper("Jefe", "what do ya want for nothing?").expect("sign"),
            "750C783E6AB0B503EAA86E310A5DB738"
        );
    }

    #[test]
    fn auth_header_carries_timestamp() {
        let header = hnap_auth_header(ANONYMOUS_KEY, "Login", 1_234).expect("sign");
        let (digest, ts) = header.split_once(' ').expect("two parts");
        assert_eq!(ts, "1234");
        assert_eq!(digest.len(), 32);
        assert_eq!(digest, digest.to_uppercase());
        assert_eq!(
            digest,
            hmac_md5_upper(ANONYMOUS_KEY, "1234http://purenetworks.com/HNAP1/Login").expect("sign")
        );
    }

    #[test]
    fn login_answer_chains_private_key() {
        let password = SecretString::from("motorola".to_owned());
        let private_key = derive_private_key("PUBKEY", &password, "CHALLENGE").expect("sign");
        assert_eq!(
            private_key.expose_secret(),
            hmac_md5_upper("PUBKEYmotorola", "CHALLENGE").expect("sign")
        );
        assert_eq!(
            login_password(&private_key, "CHALLENGE").expect("sign"),
            hmac_md5_upper(private_key.expose_secret(), "CHALLENGE").expect("sign")
        );
    }

    #[test]
    fn empty_and_oversized_keys_still_sign() {
        // HMAC hashes long keys down and pads short ones.
        assert_eq!(hmac_md5_upper("", "data").expect("sign").len(), 32);
        let long_key = "K".repeat(1024);
        assert_eq!(hmac_md5_upper(&long_key, "data").expect("sign").len(), 32);
    }

    #[test]
    fn timestamp_is_bounded() {
        let ts = hnap_timestamp();
        assert!((0..2_000_000_000_000).contains(&ts));
    }

    #[test]
    fn cookie_header_has_both_cookies() {
        let session = HnapSession::new("abc", SecretString::from("KEY".to_owned()));
        assert_eq!(session.cookie_header(), "uid=abc; PrivateKey=KEY");
    }
}
