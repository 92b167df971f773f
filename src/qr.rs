// Request-to-pay token lifecycle: mint, list, cancel, and the per-token
// countdown shown while a code is on screen. The countdown is a liveness
// signal only; authoritative status always comes back from the server.

use crate::api::{PaymentQrToken, QrTokenGrant, WalletApi};
use crate::error::{PayError, PayResult};
use crate::metrics;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Whole seconds left until `expires_at_ms`, rounded up so the display
/// reads "0:00" exactly when the deadline arrives and never before.
pub fn remaining_secs(expires_at_ms: u64, now_ms: u64) -> u64 {
    (expires_at_ms.saturating_sub(now_ms) + 999) / 1000
}

/// `M:SS` rendering of a countdown value.
pub fn format_remaining(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

/// One-per-visible-token ticking clock. The remaining value is computed once
/// from the server deadline, then decremented each second; it is strictly
/// non-increasing and stops at zero. Dropping the handle aborts the tick
/// task, so a timer outliving its view fires into nothing.
#[derive(Debug)]
pub struct Countdown {
    rx: watch::Receiver<u64>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn start(expires_at_ms: u64) -> Self {
        let initial = remaining_secs(expires_at_ms, now_millis());
        let (tx, rx) = watch::channel(initial);
        let task = tokio::spawn(async move {
            let mut left = initial;
            let mut ticker = tokio::time::interval(Duration::from_secs(1));
            ticker.tick().await; // first tick resolves immediately
            while left > 0 {
                ticker.tick().await;
                left -= 1;
                if tx.send(left).is_err() {
                    // every observer is gone; nothing to update
                    return;
                }
            }
        });
        Self { rx, task }
    }

    pub fn remaining(&self) -> u64 {
        *self.rx.borrow()
    }

    /// The owning view must treat the token as unusable once this is true,
    /// whether or not the server has expired it yet.
    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }

    /// Extra observer for the ticking value (e.g. the on-screen label).
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.rx.clone()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A minted token together with its running countdown.
#[derive(Debug)]
pub struct IssuedToken {
    pub grant: QrTokenGrant,
    pub countdown: Countdown,
}

/// Payee-side token manager: mint a "pay me" code, list the active ones,
/// cancel one that is no longer wanted.
pub struct TokenManager<A> {
    api: Arc<A>,
    wallet_id: String,
    min_amount: u64,
}

impl<A: WalletApi> TokenManager<A> {
    pub fn new(api: Arc<A>, wallet_id: String, min_amount: u64) -> Self {
        Self { api, wallet_id, min_amount }
    }

    /// Mints a request-to-pay token. Amounts under the floor are rejected
    /// locally, before any network traffic.
    pub async fn generate(&self, amount: u64, expires_in_minutes: u32) -> PayResult<IssuedToken> {
        if amount < self.min_amount {
            return Err(PayError::BelowMinimum { amount, min: self.min_amount });
        }
        let grant = self
            .api
            .generate_qr(amount, &self.wallet_id, expires_in_minutes)
            .await?;
        metrics::QR_TOKENS_GENERATED.inc();
        let countdown = Countdown::start(grant.expires_at_ms);
        Ok(IssuedToken { grant, countdown })
    }

    /// Cancels a token. Destructive: callers prompt the user before invoking.
    /// A token the server already considers terminal comes back as
    /// [`PayError::TokenTerminal`]; it drops off the active list on the next
    /// refresh either way.
    pub async fn cancel(&self, token: &str) -> PayResult<()> {
        self.api.cancel_qr(token).await
    }

    /// Authoritative active set, straight from the server. Pull-to-refresh
    /// calls this rather than trusting local countdown state.
    pub async fn list_active(&self) -> PayResult<Vec<PaymentQrToken>> {
        self.api.list_active_qr(&self.wallet_id).await
    }
}
