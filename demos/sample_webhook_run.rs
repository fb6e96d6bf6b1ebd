//! Runs a single simulated Helius webhook delivery through the full
//! signal pipeline without a database: HMAC verification, payload parsing,
//! wallet filtering, scoring, position sizing, and strategy preview.
//!
//! `cargo run --example sample_webhook_run`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway::sim_adapters::allow_all_token_safety;
use gateway::webhook::{self, HeliusSwapPayload};
use hmac::{Hmac, Mac};
use position_sizer::PositionSizer;
use risk_manager::CircuitBreaker;
use rust_decimal::Decimal;
use sha2::Sha256;
use signal_engine::{SignalFilter, SignalScorer};
use trading_core::config::{RiskConfig, SignalConfig, SizingConfig};
use trading_core::error::Result;
use trading_core::ports::{ClusterRepository, WalletRepository};
use trading_core::types::position::ConvictionTier;
use trading_core::types::wallet::WalletMeta;
use wallet_cache::WalletCache;

type HmacSha256 = Hmac<Sha256>;

/// A single known wallet, standing in for a Postgres-backed lookup.
struct OneWalletRepo {
    wallet: WalletMeta,
}

#[async_trait]
impl WalletRepository for OneWalletRepo {
    async fn find_wallet(&self, wallet: &str) -> Result<Option<WalletMeta>> {
        if wallet == self.wallet.wallet {
            Ok(Some(self.wallet.clone()))
        } else {
            Ok(None)
        }
    }
}

struct NoClusters;

#[async_trait]
impl ClusterRepository for NoClusters {
    async fn cluster_weight(&self, _cluster_id: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

const WEBHOOK_SECRET: &str = "demo-webhook-secret";

fn sample_payload() -> String {
    serde_json::json!({
        "webhookID": "wh_demo",
        "type": "SWAP",
        "timestamp": 1_732_000_000i64,
        "signature": "demo-tx-signature",
        "fee": 5000,
        "feePayer": "LeaderWallet11111111111111111111111111111",
        "slot": 123_456,
        "tokenTransfers": [
            {
                "fromUserAccount": "LeaderWallet11111111111111111111111111111",
                "toUserAccount": "PoolAccount111111111111111111111111111111",
                "mint": "So11111111111111111111111111111111111111112",
                "tokenAmount": "2.5"
            },
            {
                "fromUserAccount": "PoolAccount111111111111111111111111111111",
                "toUserAccount": "LeaderWallet11111111111111111111111111111",
                "mint": "DemoTokenMint1111111111111111111111111111",
                "tokenAmount": "50000"
            }
        ],
        "accountData": [],
        "source": "JUPITER",
        "description": "demo swap"
    })
    .to_string()
}

fn sign(body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(WEBHOOK_SECRET.as_bytes()).expect("hmac key");
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

#[tokio::main]
async fn main() {
    let body = sample_payload();
    let signature = sign(&body);

    webhook::verify_signature(WEBHOOK_SECRET, body.as_bytes(), &signature)
        .expect("signature should verify against the secret it was signed with");
    println!("webhook signature verified");

    let payload: HeliusSwapPayload = serde_json::from_str(&body).expect("payload should parse");
    let event = webhook::parse_swap_event(&payload)
        .expect("payload should parse")
        .expect("SWAP payload with matching legs should yield an event");
    println!("parsed swap event: {event:?}");

    let wallet_repo = OneWalletRepo {
        wallet: WalletMeta {
            wallet: "LeaderWallet11111111111111111111111111111".to_string(),
            is_monitored: true,
            is_blacklisted: false,
            reputation: Decimal::new(9, 1),
            cluster_id: None,
            is_leader: true,
            cached_at: chrono::Utc::now(),
            ttl: Duration::from_secs(300),
        },
    };
    let cache = Arc::new(WalletCache::new(Arc::new(wallet_repo), Duration::from_secs(300), 1000));
    let filter = SignalFilter::new(cache);
    let scorer = SignalScorer::new(
        Arc::new(SignalConfig::default()),
        Arc::new(NoClusters),
        allow_all_token_safety(),
    );

    let filter_result = filter.filter_signal(&event).await;
    println!("filter result: {:?}", filter_result.status);

    let scored = scorer.score_and_check(event, filter_result).await;
    println!(
        "scored signal: final_score={} should_trade={} explanation={}",
        scored.final_score, scored.should_trade, scored.explanation
    );

    let circuit_breaker = Arc::new(CircuitBreaker::new(RiskConfig::default()));
    circuit_breaker.seed_capital(Some(Decimal::new(50, 0)), Decimal::ZERO).await;
    let sizer = PositionSizer::new(Arc::new(SizingConfig::default()), circuit_breaker);

    let decision = sizer.size(&scored, Decimal::new(50, 0), 0, Decimal::ZERO);
    println!(
        "sizing decision: outcome={:?} final_amount_sol={} explanation={}",
        decision.outcome, decision.final_amount_sol, decision.explanation
    );

    let tier = if scored.final_score >= SizingConfig::default().high_conviction_threshold {
        ConvictionTier::High
    } else {
        ConvictionTier::Standard
    };
    println!("conviction tier: {tier:?}");
}
