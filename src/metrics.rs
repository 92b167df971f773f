use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, Registry, TextEncoder};
use std::thread;

pub static QR_TOKENS_GENERATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("faretap_qr_tokens_generated", "Request-to-pay tokens minted")
        .expect("metric definition")
});

pub static TRANSFERS_SUBMITTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("faretap_transfers_submitted", "Transfer submissions accepted by the backend")
        .expect("metric definition")
});

pub static TRANSFER_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("faretap_transfer_failures", "Transfer submissions rejected or failed")
        .expect("metric definition")
});

pub static DUPLICATE_SUBMISSIONS_BLOCKED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "faretap_duplicate_submissions_blocked",
        "Confirm invocations ignored while a submission was pending",
    )
    .expect("metric definition")
});

pub static FEE_MISMATCHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("faretap_fee_mismatches", "Receipts where net != gross - fee")
        .expect("metric definition")
});

fn registry() -> Result<Registry> {
    let registry = Registry::new();
    registry.register(Box::new(QR_TOKENS_GENERATED.clone()))?;
    registry.register(Box::new(TRANSFERS_SUBMITTED.clone()))?;
    registry.register(Box::new(TRANSFER_FAILURES.clone()))?;
    registry.register(Box::new(DUPLICATE_SUBMISSIONS_BLOCKED.clone()))?;
    registry.register(Box::new(FEE_MISMATCHES.clone()))?;
    Ok(registry)
}

pub fn serve(cfg: &crate::config::Metrics) -> Result<()> {
    let registry = registry()?;
    let bind_addr = cfg.bind.clone();
    thread::spawn(move || {
        let server = match tiny_http::Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("🔥 Could not start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        for request in server.incoming_requests() {
            let mut buffer = vec![];
            let encoder = TextEncoder::new();
            let metric_families = registry.gather();
            if encoder.encode(&metric_families, &mut buffer).is_err() {
                eprintln!("🔥 Could not encode metrics");
                continue;
            }

            let response = tiny_http::Response::from_data(buffer).with_header(
                "Content-Type: application/openmetrics-text; version=1.0.0; charset=utf-8"
                    .parse::<tiny_http::Header>()
                    .unwrap(),
            );

            let _ = request.respond(response);
        }
    });

    Ok(())
}
