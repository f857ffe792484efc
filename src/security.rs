use anyhow::Result;
use chrono::Utc;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time string comparison to prevent timing attacks
/// Use this for comparing API keys, anti-forgery tokens, and other sensitive values
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Capabilities a principal may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Administrator-level access to the multilingual text settings
    ManageOptions,
}

/// The authenticated caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user: Option<String>,
    capabilities: Vec<Capability>,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            capabilities: Vec::new(),
        }
    }

    pub fn admin(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            capabilities: vec![Capability::ManageOptions],
        }
    }

    /// Resolve a principal from an `Authorization` header value.
    ///
    /// Only `Bearer <admin_api_key>` yields the administrator; anything else
    /// is anonymous.
    pub fn from_authorization(header: Option<&str>, admin_user: &str, admin_api_key: &str) -> Self {
        let presented = header
            .and_then(|h| h.strip_prefix("Bearer "))
            .map(str::trim)
            .unwrap_or_default();

        if !presented.is_empty() && constant_time_compare(presented, admin_api_key) {
            Self::admin(admin_user)
        } else {
            Self::anonymous()
        }
    }

    /// Session user name; anti-forgery tokens are bound to it.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Actions an anti-forgery token can be scoped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenAction {
    SaveText,
    DeleteEntry,
    AjaxSave,
}

impl TokenAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenAction::SaveText => "save_text",
            TokenAction::DeleteEntry => "delete_entry",
            TokenAction::AjaxSave => "ajax_save",
        }
    }
}

/// Issues and verifies anti-forgery tokens.
///
/// A token is `hex(sha256(secret | action | session | tick))` where the tick
/// advances every half lifetime. Verification accepts the current and the
/// previous tick, so a token lives between half and the full lifetime.
#[derive(Clone)]
pub struct TokenStore {
    secret: Vec<u8>,
    lifetime_secs: i64,
}

impl TokenStore {
    pub fn new(secret: impl Into<Vec<u8>>, lifetime_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            lifetime_secs: lifetime_secs.max(2),
        }
    }

    /// Create a store keyed with 32 random bytes. Tokens do not survive a restart.
    pub fn with_random_secret(lifetime_secs: i64) -> Result<Self> {
        let mut secret = [0u8; 32];
        getrandom::getrandom(&mut secret)
            .map_err(|e| anyhow::anyhow!("Failed to generate token secret: {}", e))?;
        Ok(Self::new(secret.to_vec(), lifetime_secs))
    }

    pub fn issue(&self, action: TokenAction, session: &str) -> String {
        self.issue_at(action, session, Utc::now().timestamp())
    }

    pub fn verify(&self, action: TokenAction, session: &str, token: &str) -> bool {
        self.verify_at(action, session, token, Utc::now().timestamp())
    }

    pub fn issue_at(&self, action: TokenAction, session: &str, now: i64) -> String {
        self.digest(action, session, self.tick(now))
    }

    pub fn verify_at(&self, action: TokenAction, session: &str, token: &str, now: i64) -> bool {
        if token.is_empty() {
            return false;
        }
        let tick = self.tick(now);
        [tick, tick - 1]
            .iter()
            .any(|t| constant_time_compare(token, &self.digest(action, session, *t)))
    }

    fn tick(&self, now: i64) -> i64 {
        now.div_euclid(self.lifetime_secs / 2)
    }

    fn digest(&self, action: TokenAction, session: &str, tick: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.secret);
        hasher.update([0u8]);
        hasher.update(action.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(session.as_bytes());
        hasher.update([0u8]);
        hasher.update(tick.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore")
            .field("lifetime_secs", &self.lifetime_secs)
            .finish_non_exhaustive()
    }
}
