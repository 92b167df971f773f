#![allow(dead_code)]

// Scripted in-memory backend shared by the integration tests. Every
// endpoint counts its calls so tests can assert "zero network calls" and
// "exactly one submission" properties.

use faretap::api::{
    CounterpartyIdentity, PaymentQrToken, QrTokenGrant, TokenStatus, TransactionEntry,
    TransferRequest, TransferResult, WalletApi,
};
use faretap::error::{PayError, PayResult};
use faretap::qr::now_millis;
use faretap::resolver::same_phone;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

pub const MOCK_FEE: u64 = 250;

pub struct MockApi {
    balance: Mutex<u64>,
    users: Mutex<Vec<CounterpartyIdentity>>,
    qr_owners: Mutex<HashMap<String, CounterpartyIdentity>>,
    active_tokens: Mutex<Vec<PaymentQrToken>>,
    terminal_tokens: Mutex<HashSet<String>>,
    history: Mutex<Vec<TransactionEntry>>,
    fail_transfer_with: Mutex<Option<String>>,
    fail_validate_with: Mutex<Option<String>>,
    fail_history: AtomicBool,
    transfer_delay_ms: AtomicU64,
    seq: AtomicUsize,

    pub calls_generate: AtomicUsize,
    pub calls_validate: AtomicUsize,
    pub calls_cancel: AtomicUsize,
    pub calls_list_active: AtomicUsize,
    pub calls_balance: AtomicUsize,
    pub calls_resolve_username: AtomicUsize,
    pub calls_resolve_phone: AtomicUsize,
    pub calls_resolve_id: AtomicUsize,
    pub calls_resolve_qr: AtomicUsize,
    pub calls_transfer: AtomicUsize,
    pub calls_history: AtomicUsize,
}

impl MockApi {
    pub fn new(balance: u64) -> Self {
        Self {
            balance: Mutex::new(balance),
            users: Mutex::new(Vec::new()),
            qr_owners: Mutex::new(HashMap::new()),
            active_tokens: Mutex::new(Vec::new()),
            terminal_tokens: Mutex::new(HashSet::new()),
            history: Mutex::new(Vec::new()),
            fail_transfer_with: Mutex::new(None),
            fail_validate_with: Mutex::new(None),
            fail_history: AtomicBool::new(false),
            transfer_delay_ms: AtomicU64::new(0),
            seq: AtomicUsize::new(0),
            calls_generate: AtomicUsize::new(0),
            calls_validate: AtomicUsize::new(0),
            calls_cancel: AtomicUsize::new(0),
            calls_list_active: AtomicUsize::new(0),
            calls_balance: AtomicUsize::new(0),
            calls_resolve_username: AtomicUsize::new(0),
            calls_resolve_phone: AtomicUsize::new(0),
            calls_resolve_id: AtomicUsize::new(0),
            calls_resolve_qr: AtomicUsize::new(0),
            calls_transfer: AtomicUsize::new(0),
            calls_history: AtomicUsize::new(0),
        }
    }

    pub fn add_user(&self, user: CounterpartyIdentity) {
        self.users.lock().unwrap().push(user);
    }

    pub fn add_qr_owner(&self, token: &str, owner: CounterpartyIdentity) {
        self.qr_owners.lock().unwrap().insert(token.to_string(), owner);
    }

    pub fn add_active_token(&self, token: PaymentQrToken) {
        self.active_tokens.lock().unwrap().push(token);
    }

    pub fn mark_terminal(&self, token: &str) {
        self.terminal_tokens.lock().unwrap().insert(token.to_string());
        self.active_tokens.lock().unwrap().retain(|t| t.token != token);
    }

    pub fn fail_transfers_with(&self, message: &str) {
        *self.fail_transfer_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn clear_transfer_failure(&self) {
        self.fail_transfer_with.lock().unwrap().take();
    }

    pub fn fail_validate_with(&self, message: &str) {
        *self.fail_validate_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_history(&self) {
        self.fail_history.store(true, Ordering::SeqCst);
    }

    pub fn set_transfer_delay_ms(&self, ms: u64) {
        self.transfer_delay_ms.store(ms, Ordering::SeqCst);
    }

    pub fn balance_now(&self) -> u64 {
        *self.balance.lock().unwrap()
    }

    fn next_seq(&self) -> usize {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn settle(&self, amount: u64) -> PayResult<TransferResult> {
        let mut balance = self.balance.lock().unwrap();
        if amount > *balance {
            return Err(PayError::Backend("insufficient wallet balance".into()));
        }
        *balance -= amount;
        let n = self.next_seq();
        Ok(TransferResult {
            transaction_id: format!("tx-{n}"),
            reference: format!("REF-{n:04}"),
            amount,
            fee: MOCK_FEE,
            net_amount: amount - MOCK_FEE,
            status: "COMPLETED".into(),
        })
    }
}

impl WalletApi for MockApi {
    async fn generate_qr(
        &self,
        amount: u64,
        wallet_id: &str,
        expires_in_minutes: u32,
    ) -> PayResult<QrTokenGrant> {
        self.calls_generate.fetch_add(1, Ordering::SeqCst);
        let n = self.next_seq();
        let token = format!("tok-{n}");
        let expires_at_ms = now_millis() + u64::from(expires_in_minutes) * 60_000;
        self.active_tokens.lock().unwrap().push(PaymentQrToken {
            token: token.clone(),
            amount,
            wallet_id: wallet_id.to_string(),
            expires_at_ms,
            status: TokenStatus::Active,
        });
        Ok(QrTokenGrant {
            token,
            qr_code: format!("QRDATA-{n}"),
            amount,
            expires_at_ms,
        })
    }

    async fn validate_qr(&self, _token: &str) -> PayResult<TransferResult> {
        self.calls_validate.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.fail_validate_with.lock().unwrap().clone() {
            return Err(PayError::Backend(msg));
        }
        self.settle(5_000)
    }

    async fn cancel_qr(&self, token: &str) -> PayResult<()> {
        self.calls_cancel.fetch_add(1, Ordering::SeqCst);
        if self.terminal_tokens.lock().unwrap().contains(token) {
            return Err(PayError::TokenTerminal);
        }
        self.mark_terminal(token);
        Ok(())
    }

    async fn list_active_qr(&self, wallet_id: &str) -> PayResult<Vec<PaymentQrToken>> {
        self.calls_list_active.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .active_tokens
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    async fn get_balance(&self) -> PayResult<faretap::api::WalletBalance> {
        self.calls_balance.fetch_add(1, Ordering::SeqCst);
        Ok(faretap::api::WalletBalance { balance: self.balance_now() })
    }

    async fn resolve_by_username(&self, username: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.calls_resolve_username.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username.as_deref() == Some(username))
            .cloned())
    }

    async fn resolve_by_phone(&self, phone: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.calls_resolve_phone.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.phone_number.as_deref().is_some_and(|p| same_phone(p, phone)))
            .cloned())
    }

    async fn resolve_by_id(&self, id: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.calls_resolve_id.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn resolve_qr_token(&self, token: &str) -> PayResult<Option<CounterpartyIdentity>> {
        self.calls_resolve_qr.fetch_add(1, Ordering::SeqCst);
        Ok(self.qr_owners.lock().unwrap().get(token).cloned())
    }

    async fn transfer_funds(&self, req: &TransferRequest) -> PayResult<TransferResult> {
        self.calls_transfer.fetch_add(1, Ordering::SeqCst);
        let delay = self.transfer_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if let Some(msg) = self.fail_transfer_with.lock().unwrap().clone() {
            return Err(PayError::Backend(msg));
        }
        self.settle(req.amount)
    }

    async fn list_transactions(&self) -> PayResult<Vec<TransactionEntry>> {
        self.calls_history.fetch_add(1, Ordering::SeqCst);
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(PayError::Backend("history unavailable".into()));
        }
        Ok(self.history.lock().unwrap().clone())
    }
}

pub fn identity(id: &str, name: &str, username: Option<&str>, phone: Option<&str>) -> CounterpartyIdentity {
    CounterpartyIdentity {
        id: id.to_string(),
        display_name: name.to_string(),
        username: username.map(str::to_string),
        phone_number: phone.map(str::to_string),
        driver: None,
    }
}

pub fn session_user(id: &str, phone: Option<&str>) -> faretap::resolver::SessionUser {
    faretap::resolver::SessionUser {
        user_id: id.to_string(),
        username: Some("me".to_string()),
        phone_number: phone.map(str::to_string),
        wallet_id: "wallet-1".to_string(),
    }
}
