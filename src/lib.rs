// Payment orchestration core for the FareTap transit fare wallet.
// Screens, navigation, and session management live elsewhere; this crate
// owns the flows with real state and failure modes.

pub mod config;
pub mod error;
pub mod api;
pub mod balance;
pub mod qr;
pub mod resolver;
pub mod payment;
pub mod transfer;
pub mod receipt;
pub mod sync;
pub mod metrics;

pub use api::{
    CounterpartyIdentity, HttpWalletApi, PaymentQrToken, TokenStatus, TransferRequest,
    TransferResult, WalletApi,
};
pub use balance::BalanceOracle;
pub use error::{PayError, PayResult};
pub use payment::{Confirmation, PaymentContext, PaymentService, Receipt};
pub use qr::{Countdown, IssuedToken, TokenManager};
pub use resolver::{RecipientQuery, Resolver, SessionUser};
pub use transfer::TransferFlow;
