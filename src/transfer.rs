// Peer-to-peer send: find the recipient first (phone search or QR scan),
// then take an amount, then hand off to the confirmation service.

use crate::api::{CounterpartyIdentity, WalletApi};
use crate::error::{PayError, PayResult};
use crate::payment::{Confirmation, PaymentContext, PaymentService};
use crate::receipt::format_amount;
use crate::resolver::{normalize_phone, RecipientQuery, Resolver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

static QUIET_FLOW: AtomicBool = AtomicBool::new(false);

/// Toggle routine flow logging. Errors/warnings still log.
pub fn set_quiet_logging(quiet: bool) {
    QUIET_FLOW.store(quiet, Ordering::Relaxed);
}

macro_rules! flow_log {
    ($($arg:tt)*) => {
        if !QUIET_FLOW.load(Ordering::Relaxed) {
            println!($($arg)*);
        }
    };
}

/// Display names tied to financial actions never reach a log in full:
/// first three characters, the rest masked.
pub fn mask_name(name: &str) -> String {
    if name.is_empty() {
        return String::new();
    }
    let mut masked: String = name.chars().take(3).collect();
    masked.push_str("***");
    masked
}

/// Stateful send flow. The recipient is resolved and pinned before any
/// amount is accepted; submission goes through the shared confirmation
/// gates (sufficiency check, single-flight guard).
pub struct TransferFlow<A> {
    resolver: Resolver<A>,
    payments: Arc<PaymentService<A>>,
    min_phone_digits: usize,
    recipient: Mutex<Option<CounterpartyIdentity>>,
}

impl<A: WalletApi> TransferFlow<A> {
    pub fn new(
        resolver: Resolver<A>,
        payments: Arc<PaymentService<A>>,
        min_phone_digits: usize,
    ) -> Self {
        Self {
            resolver,
            payments,
            min_phone_digits,
            recipient: Mutex::new(None),
        }
    }

    /// User-triggered phone search (never fired per keystroke). Too-short
    /// input and the caller's own number are rejected without touching the
    /// network.
    pub async fn search_by_phone(&self, raw: &str) -> PayResult<CounterpartyIdentity> {
        let digits = normalize_phone(raw);
        if digits.len() < self.min_phone_digits {
            return Err(PayError::Validation(format!(
                "enter at least {} digits to search",
                self.min_phone_digits
            )));
        }
        let identity = self
            .resolver
            .resolve(&RecipientQuery::Phone(raw.to_string()))
            .await?;
        flow_log!("🔍 recipient matched: {}", mask_name(&identity.display_name));
        *self.recipient.lock().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    /// QR path of recipient selection. The payload may resolve to a phone
    /// number the client has never seen, so the self-guard runs again on
    /// the resolved identity.
    pub async fn scan_recipient_qr(&self, payload: &str) -> PayResult<CounterpartyIdentity> {
        let identity = self
            .resolver
            .resolve(&RecipientQuery::Qr(payload.to_string()))
            .await?;
        self.resolver.ensure_not_self(&identity)?;
        flow_log!("📷 recipient scanned: {}", mask_name(&identity.display_name));
        *self.recipient.lock().unwrap() = Some(identity.clone());
        Ok(identity)
    }

    pub fn recipient(&self) -> Option<CounterpartyIdentity> {
        self.recipient.lock().unwrap().clone()
    }

    pub fn clear_recipient(&self) {
        self.recipient.lock().unwrap().take();
    }

    /// Submits the transfer to the pinned recipient. Callers invoke this
    /// from the confirmation step, after the user approved name and amount.
    /// On success the flow resets so the screen can return to where it
    /// came from.
    pub async fn submit(&self, amount: u64, description: Option<String>) -> PayResult<Confirmation> {
        let to = self
            .recipient
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| PayError::Validation("select a recipient first".into()))?;
        flow_log!(
            "💸 transfer confirm: to={} amount={}",
            mask_name(&to.display_name),
            format_amount(amount)
        );
        let ctx = PaymentContext { description, transport: None };
        let outcome = self.payments.confirm(&to, amount, ctx).await?;
        if matches!(outcome, Confirmation::Completed(_)) {
            self.clear_recipient();
        }
        Ok(outcome)
    }
}
