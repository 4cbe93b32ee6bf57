//! Authentication (`spec.md` §2 item 7, §4.6): the central-server
//! challenge/verify handshake that turns a game account identity into a
//! long-term authkey, from which the `Login` packet's TOTP code is
//! derived each connection.

use std::time::Duration;

use crate::crypto::{self, CryptoError, KeyBox};

const HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("challenge request failed: {0}")]
    ChallengeFailed(String),
    #[error("challenge response was malformed: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("message upload to the verification account failed: {0}")]
    MessageUploadFailed(String),
    #[error("verify request failed: {0}")]
    VerifyFailed(String),
    #[error("stored authentication token has expired")]
    TokenExpired,
}

/// The "game's own messaging backend" the account-ownership proof rides
/// on (`spec.md` §4.6 step 2) — out of this crate's networking scope, a
/// port the embedder implements against its platform's private-message
/// API. Upload/delete are modeled as blocking calls rather than the
/// delegate callbacks the original used (`SPEC_FULL.md` §5/design notes):
/// the caller is expected to have already awaited whatever oneshot the
/// embedder's own async layer produced before this trait method returns.
pub trait MessagePort {
    fn upload_message(&mut self, target_account_id: i32, body: &str) -> Result<String, AuthError>;
    fn delete_message(&mut self, message_id: &str) -> Result<(), AuthError>;
}

/// The account identity used on every central-server request.
#[derive(Debug, Clone)]
pub struct AccountIdentity {
    pub account_id: i32,
    pub user_id: i32,
    pub account_name: String,
}

pub struct ChallengeAnswer {
    pub account_id: i32,
    pub answer: String,
    pub server_pubkey: [u8; 32],
    pub secure: bool,
}

pub struct AuthKey(pub [u8; 32]);

/// Talks to one central server's `/challenge/*` endpoints.
pub struct AuthClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::blocking::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("globed-core/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("reqwest client with a fixed timeout and user agent should always build");
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Step 1: POST `/challenge/new`, decode+decrypt the returned token
    /// with our own keybox, producing the plaintext answer the verify
    /// step must prove knowledge of.
    pub fn challenge_new(&self, identity: &AccountIdentity, keybox: &KeyBox) -> Result<ChallengeAnswer, AuthError> {
        let resp = self
            .http
            .post(format!("{}/challenge/new", self.base_url))
            .query(&[
                ("aid", identity.account_id.to_string()),
                ("uid", identity.user_id.to_string()),
                ("aname", identity.account_name.clone()),
                ("protocol", PROTOCOL_VERSION.to_string()),
            ])
            .send()
            .map_err(|e| AuthError::ChallengeFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::ChallengeFailed(format!("status {}", resp.status())));
        }

        let body = resp.text().map_err(|e| AuthError::ChallengeFailed(e.to_string()))?;
        parse_challenge_response(&body, keybox)
    }

    /// Step 2: upload the one-time proof message (unless `account_id ==
    /// -1`, a trusted environment), POST `/challenge/verify`, and derive
    /// the session's long-term authkey from the returned token.
    pub fn verify(
        &self,
        identity: &AccountIdentity,
        answer: &ChallengeAnswer,
        messenger: &mut dyn MessagePort,
    ) -> Result<AuthKey, AuthError> {
        let message_id = if answer.account_id == -1 {
            None
        } else {
            Some(messenger.upload_message(answer.account_id, &answer.answer)?)
        };

        let resp = self
            .http
            .post(format!("{}/challenge/verify", self.base_url))
            .query(&[
                ("aid", identity.account_id.to_string()),
                ("uid", identity.user_id.to_string()),
                ("aname", identity.account_name.clone()),
                ("answer", answer.answer.clone()),
            ])
            .send()
            .map_err(|e| AuthError::VerifyFailed(e.to_string()))?;

        if !resp.status().is_success() {
            if let Some(message_id) = &message_id {
                let _ = messenger.delete_message(message_id);
            }
            return Err(AuthError::VerifyFailed(format!("status {}", resp.status())));
        }

        let body = resp.text().map_err(|e| AuthError::VerifyFailed(e.to_string()))?;
        let key = parse_verify_response(&body);

        if let Some(message_id) = &message_id {
            messenger.delete_message(message_id)?;
        }

        key
    }

    /// `POST /totplogin`: exchanges a stored authkey for a one-time login
    /// token, letting a returning client skip the challenge/verify round
    /// trip entirely (`spec.md` §6 HTTP surface).
    pub fn totp_login(&self, identity: &AccountIdentity, authkey: &AuthKey) -> Result<String, AuthError> {
        let totp = crypto::totp::generate(&authkey.0)?;
        let resp = self
            .http
            .post(format!("{}/totplogin", self.base_url))
            .query(&[
                ("aid", identity.account_id.to_string()),
                ("uid", identity.user_id.to_string()),
                ("aname", identity.account_name.clone()),
                ("authkey", crypto::base64_url_encode(&authkey.0)),
            ])
            .send()
            .map_err(|e| AuthError::ChallengeFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::ChallengeFailed(format!("status {}", resp.status())));
        }

        resp.text().map_err(|e| AuthError::ChallengeFailed(e.to_string()))
    }
}

fn parse_challenge_response(body: &str, keybox: &KeyBox) -> Result<ChallengeAnswer, AuthError> {
    let parts: Vec<&str> = body.trim().split(':').collect();
    if parts.len() < 3 {
        return Err(AuthError::MalformedResponse(body.to_string()));
    }

    let account_id: i32 = parts[0]
        .parse()
        .map_err(|_| AuthError::MalformedResponse("non-integer accountId".into()))?;
    let chtoken = crypto::base64_decode(parts[1]).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    let pubkey_bytes =
        crypto::base64_decode(parts[2]).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    let server_pubkey: [u8; 32] = pubkey_bytes
        .try_into()
        .map_err(|_| AuthError::MalformedResponse("pubkey was not 32 bytes".into()))?;
    let secure = parts.get(3).map(|s| *s == "1").unwrap_or(false);

    let shared = keybox.derive_shared(server_pubkey);
    let answer_bytes = shared.open(&chtoken)?;
    let answer = String::from_utf8(answer_bytes).map_err(|_| AuthError::MalformedResponse("answer was not utf8".into()))?;

    Ok(ChallengeAnswer {
        account_id,
        answer,
        server_pubkey,
        secure,
    })
}

fn parse_verify_response(body: &str) -> Result<AuthKey, AuthError> {
    let (_, encoded_authkey) = body
        .trim()
        .split_once(':')
        .ok_or_else(|| AuthError::MalformedResponse(body.to_string()))?;
    let raw = crypto::base64_decode(encoded_authkey).map_err(|e| AuthError::MalformedResponse(e.to_string()))?;
    Ok(AuthKey(crypto::domain_hash("storage", &raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubMessenger {
        uploaded: Vec<(i32, String)>,
        deleted: Vec<String>,
    }

    impl MessagePort for StubMessenger {
        fn upload_message(&mut self, target_account_id: i32, body: &str) -> Result<String, AuthError> {
            self.uploaded.push((target_account_id, body.to_string()));
            Ok("msg-1".into())
        }

        fn delete_message(&mut self, message_id: &str) -> Result<(), AuthError> {
            self.deleted.push(message_id.to_string());
            Ok(())
        }
    }

    #[test]
    fn parses_a_well_formed_challenge_response() {
        let keybox = KeyBox::generate();
        let server_box = KeyBox::generate();
        let shared_for_encrypt = server_box.derive_shared(keybox.public_key_bytes());
        let sealed = shared_for_encrypt.seal(b"the-answer").unwrap();

        let body = format!(
            "5:{}:{}:1",
            crypto::base64_encode(&sealed),
            crypto::base64_encode(&server_box.public_key_bytes())
        );

        let parsed = parse_challenge_response(&body, &keybox).unwrap();
        assert_eq!(parsed.account_id, 5);
        assert_eq!(parsed.answer, "the-answer");
        assert!(parsed.secure);
    }

    #[test]
    fn rejects_malformed_challenge_response() {
        let keybox = KeyBox::generate();
        assert!(parse_challenge_response("not-enough-parts", &keybox).is_err());
    }

    #[test]
    fn parses_verify_response_into_a_storage_key() {
        let body = format!("msg-1:{}", crypto::base64_encode(b"some authkey bytes"));
        let key = parse_verify_response(&body).unwrap();
        assert_eq!(key.0.len(), 32);
    }

    #[test]
    fn messenger_is_invoked_with_the_target_account() {
        let mut messenger = StubMessenger {
            uploaded: Vec::new(),
            deleted: Vec::new(),
        };
        messenger.upload_message(42, "proof").unwrap();
        assert_eq!(messenger.uploaded, vec![(42, "proof".to_string())]);
    }
}
