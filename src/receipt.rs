// Fee/net presentation for the payee's receipt. The fee schedule lives
// server-side; nothing here recomputes money, it only formats and checks.

use crate::api::TransferResult;
use crate::metrics;
use std::fmt;

/// Gross amount, platform fee, and net received, as the server reported
/// them. A `net != gross - fee` payload is flagged and logged, never
/// silently rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub gross: u64,
    pub fee: u64,
    pub net: u64,
}

impl FeeBreakdown {
    pub fn from_result(result: &TransferResult) -> Self {
        let breakdown = FeeBreakdown {
            gross: result.amount,
            fee: result.fee,
            net: result.net_amount,
        };
        if !breakdown.is_consistent() {
            metrics::FEE_MISMATCHES.inc();
            eprintln!(
                "⚠️  fee breakdown mismatch on {}: gross={} fee={} net={}",
                result.transaction_id, breakdown.gross, breakdown.fee, breakdown.net
            );
        }
        breakdown
    }

    pub fn is_consistent(&self) -> bool {
        self.net == self.gross.saturating_sub(self.fee)
    }
}

impl fmt::Display for FeeBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "amount {} | fee {} | received {}",
            format_amount(self.gross),
            format_amount(self.fee),
            format_amount(self.net)
        )
    }
}

/// Minor currency units with thousands separators: 50000 -> "50.000".
pub fn format_amount(minor: u64) -> String {
    let digits = minor.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out
}
