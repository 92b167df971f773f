// Terminal step of every payment: turn a resolved counterparty and an amount
// into exactly one submission, or a reason not to submit.

use crate::api::{CounterpartyIdentity, TransferRequest, TransferResult, WalletApi};
use crate::balance::BalanceOracle;
use crate::error::{PayError, PayResult};
use crate::metrics;
use crate::qr::now_millis;
use crate::receipt::FeeBreakdown;
use crate::resolver::SessionUser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Clears the in-flight flag when dropped, whatever path the submission
/// took. Acquisition happens synchronously, before the first await.
pub(crate) struct FlightPermit<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FlightPermit<'a> {
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        Some(Self { flag })
    }
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Optional context shown on the confirmation screen and forwarded to the
/// backend as the transfer description.
#[derive(Debug, Clone, Default)]
pub struct PaymentContext {
    pub description: Option<String>,
    /// Transport type for fare payments ("bus", "angkot", ...).
    pub transport: Option<String>,
}

impl PaymentContext {
    fn wire_description(&self) -> Option<String> {
        self.description
            .clone()
            .or_else(|| self.transport.as_ref().map(|t| format!("{t} fare")))
    }
}

/// Everything the receipt view needs. Immutable once assembled.
#[derive(Debug, Clone)]
pub struct Receipt {
    pub transaction_id: String,
    pub reference: String,
    pub amount: u64,
    pub fee: u64,
    pub net_amount: u64,
    pub counterparty: String,
    pub timestamp_ms: u64,
    pub status: String,
}

impl Receipt {
    fn assemble(result: TransferResult, to: &CounterpartyIdentity, timestamp_ms: u64) -> Self {
        // the breakdown runs the fee/net sanity check; server values win
        let breakdown = FeeBreakdown::from_result(&result);
        Receipt {
            transaction_id: result.transaction_id,
            reference: result.reference,
            amount: breakdown.gross,
            fee: breakdown.fee,
            net_amount: breakdown.net,
            counterparty: to
                .username
                .clone()
                .unwrap_or_else(|| to.display_name.clone()),
            timestamp_ms,
            status: result.status,
        }
    }
}

/// How a confirmation attempt ended. Backend and network failures come back
/// as `Err` instead; the caller stays on the confirmation screen and may
/// retry, which re-arms the single-flight guard.
#[derive(Debug)]
pub enum Confirmation {
    Completed(Receipt),
    /// Client-side short-circuit: no transfer call was made. The caller
    /// offers a recharge redirect.
    InsufficientFunds { requested: u64, available: u64 },
    /// A submission was already pending; this invocation did nothing.
    DuplicateIgnored,
}

/// Balance-gated, single-flight submission of transfers and QR redemptions.
pub struct PaymentService<A> {
    api: Arc<A>,
    balance: Arc<BalanceOracle<A>>,
    me: SessionUser,
    in_flight: AtomicBool,
}

impl<A: WalletApi> PaymentService<A> {
    pub fn new(api: Arc<A>, balance: Arc<BalanceOracle<A>>, me: SessionUser) -> Self {
        Self { api, balance, me, in_flight: AtomicBool::new(false) }
    }

    pub fn balance_oracle(&self) -> &BalanceOracle<A> {
        &self.balance
    }

    /// True while a submission is pending. The UI keeps its cancel controls
    /// disabled for exactly this window: once sent, a transfer cannot be
    /// client-cancelled.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Confirms a direct transfer. Callers invoke this only after the user
    /// explicitly approved the recipient and amount.
    pub async fn confirm(
        &self,
        to: &CounterpartyIdentity,
        amount: u64,
        ctx: PaymentContext,
    ) -> PayResult<Confirmation> {
        if amount == 0 {
            return Err(PayError::Validation("amount must be greater than zero".into()));
        }
        if to.id == self.me.user_id {
            return Err(PayError::SelfTransfer);
        }
        if let Some(short) = self.check_sufficiency(amount).await? {
            return Ok(short);
        }

        let Some(_permit) = FlightPermit::acquire(&self.in_flight) else {
            return self.duplicate_ignored();
        };
        let req = TransferRequest {
            to_user_id: to.id.clone(),
            amount,
            description: ctx.wire_description(),
        };
        let outcome = self.api.transfer_funds(&req).await;
        self.refetch_balance().await;
        match outcome {
            Ok(result) => {
                metrics::TRANSFERS_SUBMITTED.inc();
                Ok(Confirmation::Completed(Receipt::assemble(result, to, now_millis())))
            }
            Err(e) => {
                metrics::TRANSFER_FAILURES.inc();
                Err(e)
            }
        }
    }

    /// Redeems a scanned request-to-pay token under the same gates as
    /// [`confirm`](Self::confirm). `amount_hint` is the amount carried in the
    /// QR payload, when present; without it the sufficiency short-circuit is
    /// skipped and the server decides. An expired token comes back as an
    /// ordinary backend rejection; expiry is a race between clocks.
    pub async fn redeem_token(
        &self,
        to: &CounterpartyIdentity,
        token: &str,
        amount_hint: Option<u64>,
    ) -> PayResult<Confirmation> {
        self.ensure_not_self(to)?;
        if let Some(amount) = amount_hint {
            if amount == 0 {
                return Err(PayError::Validation("amount must be greater than zero".into()));
            }
            if let Some(short) = self.check_sufficiency(amount).await? {
                return Ok(short);
            }
        }

        let Some(_permit) = FlightPermit::acquire(&self.in_flight) else {
            return self.duplicate_ignored();
        };
        let outcome = self.api.validate_qr(token).await;
        self.refetch_balance().await;
        match outcome {
            Ok(result) => {
                metrics::TRANSFERS_SUBMITTED.inc();
                Ok(Confirmation::Completed(Receipt::assemble(result, to, now_millis())))
            }
            Err(e) => {
                metrics::TRANSFER_FAILURES.inc();
                Err(e)
            }
        }
    }

    fn ensure_not_self(&self, to: &CounterpartyIdentity) -> PayResult<()> {
        if to.id == self.me.user_id {
            return Err(PayError::SelfTransfer);
        }
        Ok(())
    }

    /// UX short-circuit against the latest fetched balance. The server is
    /// still the authority and may reject anyway.
    async fn check_sufficiency(&self, amount: u64) -> PayResult<Option<Confirmation>> {
        let available = match self.balance.last_known() {
            Some(b) => b,
            None => self.balance.refresh().await?,
        };
        if amount > available {
            return Ok(Some(Confirmation::InsufficientFunds { requested: amount, available }));
        }
        Ok(None)
    }

    fn duplicate_ignored(&self) -> PayResult<Confirmation> {
        metrics::DUPLICATE_SUBMISSIONS_BLOCKED.inc();
        println!("⏳ submission already pending, duplicate confirm ignored");
        Ok(Confirmation::DuplicateIgnored)
    }

    /// The balance shown after a submission is never the local preview;
    /// failure to re-fetch must not fail the payment itself.
    async fn refetch_balance(&self) {
        if let Err(e) = self.balance.refresh().await {
            eprintln!("⚠️  balance refresh after submission failed: {e}");
        }
    }
}
