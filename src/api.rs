// Wallet backend collaborators: wire types and the HTTP client.
// The server owns all lifecycle truth; nothing returned here is cached
// authoritatively on the client.

use crate::error::{PayError, PayResult, GENERIC_FAILURE};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server-assigned status of a request-to-pay token. Transitions are
/// one-directional: ACTIVE is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenStatus {
    Active,
    Redeemed,
    Expired,
    Cancelled,
}

impl TokenStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TokenStatus::Active)
    }
}

/// A pending request-to-pay, as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQrToken {
    pub token: String,
    pub amount: u64,
    pub wallet_id: String,
    pub expires_at_ms: u64,
    pub status: TokenStatus,
}

impl PaymentQrToken {
    /// Status for display purposes only. An ACTIVE token whose deadline has
    /// passed on the local clock renders as expired; the authoritative
    /// `status` field is never touched; the next list refresh settles it.
    pub fn display_status(&self, now_ms: u64) -> TokenStatus {
        if self.status == TokenStatus::Active && now_ms >= self.expires_at_ms {
            TokenStatus::Expired
        } else {
            self.status
        }
    }
}

/// Freshly minted token plus the scannable code to render.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrTokenGrant {
    pub token: String,
    pub qr_code: String,
    pub amount: u64,
    pub expires_at_ms: u64,
}

/// Role-specific details shown when the counterparty drives for the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverInfo {
    #[serde(default)]
    pub vehicle_type: Option<String>,
    #[serde(default)]
    pub plate_number: Option<String>,
    #[serde(default)]
    pub rating: Option<f32>,
}

/// The other party of a payment, resolved per attempt and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyIdentity {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub driver: Option<DriverInfo>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub to_user_id: String,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Outcome of a settled transfer. Immutable; used only for the receipt.
/// `fee` and `net_amount` are computed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
    pub transaction_id: String,
    pub reference: String,
    pub amount: u64,
    pub fee: u64,
    pub net_amount: u64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletBalance {
    pub balance: u64,
}

/// One row of the wallet's transaction history.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub transaction_id: String,
    pub amount: u64,
    pub fee: u64,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at_ms: u64,
    pub incoming: bool,
}

/// The backend capabilities the payment core consumes. Implemented by
/// [`HttpWalletApi`] in production and by scripted mocks in tests.
///
/// Resolution lookups return `Ok(None)` for "no such account": not-found is
/// an ordinary outcome there, not an error.
#[allow(async_fn_in_trait)]
pub trait WalletApi {
    async fn generate_qr(
        &self,
        amount: u64,
        wallet_id: &str,
        expires_in_minutes: u32,
    ) -> PayResult<QrTokenGrant>;

    /// Redeems a scanned token, executing the payment it describes.
    async fn validate_qr(&self, token: &str) -> PayResult<TransferResult>;

    async fn cancel_qr(&self, token: &str) -> PayResult<()>;

    async fn list_active_qr(&self, wallet_id: &str) -> PayResult<Vec<PaymentQrToken>>;

    async fn get_balance(&self) -> PayResult<WalletBalance>;

    async fn resolve_by_username(&self, username: &str) -> PayResult<Option<CounterpartyIdentity>>;

    async fn resolve_by_phone(&self, phone: &str) -> PayResult<Option<CounterpartyIdentity>>;

    async fn resolve_by_id(&self, id: &str) -> PayResult<Option<CounterpartyIdentity>>;

    /// Looks up the identity behind a QR redemption token.
    async fn resolve_qr_token(&self, token: &str) -> PayResult<Option<CounterpartyIdentity>>;

    async fn transfer_funds(&self, req: &TransferRequest) -> PayResult<TransferResult>;

    async fn list_transactions(&self) -> PayResult<Vec<TransactionEntry>>;
}

/// Standard response envelope used by every wallet endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct Envelope<T> {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<T>,
}

/// JSON/HTTP implementation of [`WalletApi`].
#[derive(Clone)]
pub struct HttpWalletApi {
    base: String,
    client: reqwest::Client,
}

impl HttpWalletApi {
    /// `base` like "https://api.faretap.example". Optional bearer token is
    /// attached to every request.
    pub fn new(base: &str, timeout_secs: u64, bearer: Option<&str>) -> PayResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(token) = bearer {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| PayError::Validation("bearer token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()?;
        Ok(Self {
            base: base.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base, path.trim_start_matches('/'))
    }

    fn unwrap_envelope<T>(env: Envelope<T>) -> PayResult<T> {
        if !env.success {
            return Err(PayError::Backend(
                env.message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ));
        }
        env.data
            .ok_or_else(|| PayError::Backend("response is missing its payload".to_string()))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> PayResult<T> {
        let resp = self.client.post(self.url(path)).json(body).send().await?;
        let env: Envelope<T> = resp.json().await?;
        Self::unwrap_envelope(env)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> PayResult<T> {
        let resp = self.client.get(self.url(path)).send().await?;
        let env: Envelope<T> = resp.json().await?;
        Self::unwrap_envelope(env)
    }

    /// GET where 404 means "no such record" rather than a failure.
    async fn get_optional<T: DeserializeOwned>(&self, path: &str) -> PayResult<Option<T>> {
        let resp = self.client.get(self.url(path)).send().await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let env: Envelope<T> = resp.json().await?;
        Self::unwrap_envelope(env).map(Some)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateQrBody<'a> {
    amount: u64,
    wallet_id: &'a str,
    expires_in_minutes: u32,
}

#[derive(Serialize)]
struct TokenBody<'a> {
    token: &'a str,
}

impl WalletApi for HttpWalletApi {
    async fn generate_qr(
        &self,
        amount: u64,
        wallet_id: &str,
        expires_in_minutes: u32,
    ) -> PayResult<QrTokenGrant> {
        let body = GenerateQrBody { amount, wallet_id, expires_in_minutes };
        self.post_json("wallet/qr/generate", &body).await
    }

    async fn validate_qr(&self, token: &str) -> PayResult<TransferResult> {
        self.post_json("wallet/qr/validate", &TokenBody { token }).await
    }

    async fn cancel_qr(&self, token: &str) -> PayResult<()> {
        let resp = self
            .client
            .post(self.url("wallet/qr/cancel"))
            .json(&TokenBody { token })
            .send()
            .await?;
        // The server answers 409 when the token already reached a terminal
        // status; the active list will drop it on the next refresh.
        if resp.status() == StatusCode::CONFLICT {
            return Err(PayError::TokenTerminal);
        }
        let env: Envelope<serde_json::Value> = resp.json().await?;
        if !env.success {
            return Err(PayError::Backend(
                env.message.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
            ));
        }
        Ok(())
    }

    async fn list_active_qr(&self, wallet_id: &str) -> PayResult<Vec<PaymentQrToken>> {
        self.get_json(&format!("wallet/qr/active?walletId={wallet_id}")).await
    }

    async fn get_balance(&self) -> PayResult<WalletBalance> {
        self.get_json("wallet/balance").await
    }

    async fn resolve_by_username(&self, username: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.get_optional(&format!("users/by-username/{username}")).await
    }

    async fn resolve_by_phone(&self, phone: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.get_optional(&format!("users/by-phone/{phone}")).await
    }

    async fn resolve_by_id(&self, id: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.get_optional(&format!("users/{id}")).await
    }

    async fn resolve_qr_token(&self, token: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.get_optional(&format!("wallet/qr/{token}/owner")).await
    }

    async fn transfer_funds(&self, req: &TransferRequest) -> PayResult<TransferResult> {
        self.post_json("wallet/transfer", req).await
    }

    async fn list_transactions(&self) -> PayResult<Vec<TransactionEntry>> {
        self.get_json("wallet/transactions").await
    }
}
