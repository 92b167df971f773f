// Pull-to-refresh coordination: the dashboard re-fetches balance, active
// tokens, and history as independent reads. One failing read logs and
// yields nothing; the siblings still land.

use crate::api::{PaymentQrToken, TransactionEntry, WalletApi};
use crate::balance::BalanceOracle;
use crate::error::PayResult;
use crate::qr::TokenManager;

/// Result of one refresh pass. `None` in a field means that read failed
/// this round; the previous screen state for it stays as-is.
#[derive(Debug, Default)]
pub struct DashboardSnapshot {
    pub balance: Option<u64>,
    pub active_tokens: Option<Vec<PaymentQrToken>>,
    pub history: Option<Vec<TransactionEntry>>,
}

pub async fn refresh_dashboard<A: WalletApi>(
    api: &A,
    balance: &BalanceOracle<A>,
    tokens: &TokenManager<A>,
) -> DashboardSnapshot {
    let (balance, active_tokens, history) = tokio::join!(
        balance.refresh(),
        tokens.list_active(),
        api.list_transactions(),
    );
    DashboardSnapshot {
        balance: ok_or_log("balance", balance),
        active_tokens: ok_or_log("active tokens", active_tokens),
        history: ok_or_log("history", history),
    }
}

fn ok_or_log<T>(what: &str, result: PayResult<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            eprintln!("⚠️  {what} refresh failed: {e}");
            None
        }
    }
}
