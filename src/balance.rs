use crate::api::WalletApi;
use crate::error::PayResult;
use std::sync::{Arc, Mutex};

/// Refreshable view of the wallet balance. Everything above this reads it,
/// nothing mutates it locally: the server is the only writer, and the value
/// is re-fetched after every submission rather than decremented in place.
pub struct BalanceOracle<A> {
    api: Arc<A>,
    last: Mutex<Option<u64>>,
}

impl<A: WalletApi> BalanceOracle<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api, last: Mutex::new(None) }
    }

    /// Fetches the current balance and remembers it.
    pub async fn refresh(&self) -> PayResult<u64> {
        let balance = self.api.get_balance().await?.balance;
        *self.last.lock().unwrap() = Some(balance);
        Ok(balance)
    }

    /// Most recent fetched balance, if any fetch has happened.
    pub fn last_known(&self) -> Option<u64> {
        *self.last.lock().unwrap()
    }

    /// Projected balance after spending `amount`. Display-only preview: the
    /// real post-transfer balance always comes from a fresh fetch.
    pub fn preview_after(&self, amount: u64) -> Option<u64> {
        self.last_known().map(|b| b.saturating_sub(amount))
    }
}
