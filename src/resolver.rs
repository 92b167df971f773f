// Counterparty resolution. Four identification channels funnel through one
// dispatch so the self-transfer guard and the error taxonomy are enforced in
// exactly one place.

use crate::api::{CounterpartyIdentity, WalletApi};
use crate::error::{PayError, PayResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD as B64, Engine as _};
use serde::Deserialize;
use std::sync::Arc;

/// The authenticated user, as far as the payment core needs to know them.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub user_id: String,
    pub username: Option<String>,
    pub phone_number: Option<String>,
    pub wallet_id: String,
}

/// One of the supported ways to point at a recipient.
#[derive(Debug, Clone)]
pub enum RecipientQuery {
    /// Raw scanned QR payload, not yet parsed.
    Qr(String),
    Username(String),
    Phone(String),
    UserId(String),
}

/// Structured content of a payment QR. Carries a redemption token and/or a
/// direct identity reference, plus an optional pre-agreed amount.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub amount: Option<u64>,
}

impl QrPayload {
    /// Accepts the payload as JSON or base64url(JSON). Anything that does not
    /// parse into a token or identity reference is [`PayError::InvalidPayload`]
    /// (a corrupt or foreign code, distinct from a lookup that finds nobody).
    pub fn parse(raw: &str) -> PayResult<Self> {
        let raw = raw.trim();
        let payload: QrPayload = serde_json::from_str(raw).or_else(|_| {
            let bytes = B64.decode(raw.as_bytes()).map_err(|_| PayError::InvalidPayload)?;
            serde_json::from_slice(&bytes).map_err(|_| PayError::InvalidPayload)
        })?;
        if payload.token.is_none() && payload.user_id.is_none() {
            return Err(PayError::InvalidPayload);
        }
        Ok(payload)
    }
}

/// Digits only; formatting characters and "+" are dropped.
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Phone equality tolerant of one side carrying a country prefix: after
/// normalization, "+62 812-345-678", "0812345678" and "812345678" all
/// compare equal. Requires at least 8 significant digits to match.
pub fn same_phone(a: &str, b: &str) -> bool {
    let a = normalize_phone(a);
    let b = normalize_phone(b);
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let significant = short.trim_start_matches('0');
    significant.len() >= 8 && long.ends_with(significant)
}

pub struct Resolver<A> {
    api: Arc<A>,
    me: SessionUser,
}

impl<A: WalletApi> Resolver<A> {
    pub fn new(api: Arc<A>, me: SessionUser) -> Self {
        Self { api, me }
    }

    pub fn session_user(&self) -> &SessionUser {
        &self.me
    }

    /// Resolves a recipient from any channel. Not-found surfaces as
    /// [`PayError::NotFound`] so callers can offer a retry; the self-transfer
    /// guard runs before the lookup when the value is already comparable
    /// (phone, user id) and always runs again on the resolved identity.
    pub async fn resolve(&self, query: &RecipientQuery) -> PayResult<CounterpartyIdentity> {
        let found = match query {
            RecipientQuery::Phone(raw) => {
                let phone = normalize_phone(raw);
                if phone.is_empty() {
                    return Err(PayError::Validation("a phone number is required".into()));
                }
                if let Some(own) = &self.me.phone_number {
                    if same_phone(&phone, own) {
                        return Err(PayError::SelfTransfer);
                    }
                }
                self.api.resolve_by_phone(&phone).await?
            }
            RecipientQuery::Username(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(PayError::Validation("a username is required".into()));
                }
                self.api.resolve_by_username(name).await?
            }
            RecipientQuery::UserId(id) => {
                if *id == self.me.user_id {
                    return Err(PayError::SelfTransfer);
                }
                self.api.resolve_by_id(id).await?
            }
            RecipientQuery::Qr(raw) => {
                let payload = QrPayload::parse(raw)?;
                if let Some(token) = &payload.token {
                    self.api.resolve_qr_token(token).await?
                } else {
                    // parse() guarantees user_id is present here
                    let id = payload.user_id.as_deref().unwrap_or_default();
                    if id == self.me.user_id {
                        return Err(PayError::SelfTransfer);
                    }
                    self.api.resolve_by_id(id).await?
                }
            }
        };
        let identity = found.ok_or(PayError::NotFound)?;
        self.ensure_not_self(&identity)?;
        Ok(identity)
    }

    /// Rejects an identity that is actually the caller. A QR or token lookup
    /// can resolve to a phone number the client never saw, so this runs on
    /// the resolved identity as well as on raw inputs.
    pub fn ensure_not_self(&self, identity: &CounterpartyIdentity) -> PayResult<()> {
        if identity.id == self.me.user_id {
            return Err(PayError::SelfTransfer);
        }
        if let (Some(theirs), Some(ours)) = (&identity.phone_number, &self.me.phone_number) {
            if same_phone(theirs, ours) {
                return Err(PayError::SelfTransfer);
            }
        }
        Ok(())
    }
}
