//! Throughput benchmarks for bulk pipeline operations.
//!
//! Run with: `cargo bench --bench throughput`

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use rust_decimal::Decimal;
use tokio::runtime::Runtime;
use uuid::Uuid;

use order_engine::priority_queue::OrderPriorityQueue;
use signal_engine::{SignalFilter, SignalScorer};
use trading_core::config::SignalConfig;
use trading_core::error::Result;
use trading_core::ports::{ClusterRepository, TokenSafety, WalletRepository};
use trading_core::types::order::{ExitReason, Order};
use trading_core::types::position::{ConvictionTier, Position};
use trading_core::types::swap::{SwapDirection, SwapEvent};
use trading_core::types::wallet::WalletMeta;
use wallet_cache::WalletCache;

struct ManyWalletsRepo {
    wallets: HashMap<String, WalletMeta>,
}

#[async_trait]
impl WalletRepository for ManyWalletsRepo {
    async fn find_wallet(&self, wallet: &str) -> Result<Option<WalletMeta>> {
        Ok(self.wallets.get(wallet).cloned())
    }
}

struct NoClusters;

#[async_trait]
impl ClusterRepository for NoClusters {
    async fn cluster_weight(&self, _cluster_id: &str) -> Result<Option<Decimal>> {
        Ok(None)
    }
}

struct AllowAllSafety;

#[async_trait]
impl TokenSafety for AllowAllSafety {
    async fn is_safe(&self, _token: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Generate a batch of swap events from a mix of monitored, unmonitored, and
/// blacklisted wallets, the same traffic shape the webhook endpoint sees.
fn generate_signal_batch(count: usize) -> (Vec<SwapEvent>, HashMap<String, WalletMeta>) {
    let mut rng = rand::thread_rng();
    let mut wallets = HashMap::with_capacity(count);
    let mut events = Vec::with_capacity(count);

    for i in 0..count {
        let wallet = format!("Wallet{i:040}");
        let roll = rng.gen_range(0..10);
        let meta = WalletMeta {
            wallet: wallet.clone(),
            is_monitored: roll < 8,
            is_blacklisted: roll == 9,
            reputation: Decimal::new(rng.gen_range(30..99), 2),
            cluster_id: None,
            is_leader: roll == 0,
            cached_at: Utc::now(),
            ttl: Duration::from_secs(300),
        };
        wallets.insert(wallet.clone(), meta);

        events.push(SwapEvent::new(
            format!("sig_{i}"),
            wallet,
            format!("TokenMint{i:032}"),
            SwapDirection::Buy,
            Decimal::new(rng.gen_range(1..50), 1),
            Decimal::new(rng.gen_range(1_000..100_000), 0),
            i as u64,
            5000,
            Utc::now(),
        ));
    }

    (events, wallets)
}

/// C2-C4: filter then score a batch of signals end to end, the same sequence
/// the webhook handler runs per delivery.
fn bench_signal_pipeline_throughput(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("signal_pipeline");

    for count in [10, 100, 1_000, 5_000].iter() {
        let (events, wallets) = generate_signal_batch(*count);
        let cache = Arc::new(WalletCache::new(Arc::new(ManyWalletsRepo { wallets }), Duration::from_secs(300), count * 2));
        let filter = SignalFilter::new(cache);
        let scorer = SignalScorer::new(Arc::new(SignalConfig::default()), Arc::new(NoClusters), Arc::new(AllowAllSafety));

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("filter_and_score", count), &events, |b, events| {
            b.iter(|| {
                rt.block_on(async {
                    let mut traded = 0usize;
                    for event in events {
                        let filter_result = filter.filter_signal(event).await;
                        if filter_result.status == trading_core::types::wallet::FilterStatus::Passed {
                            let scored = scorer.score_and_check(event.clone(), filter_result).await;
                            if scored.should_trade {
                                traded += 1;
                            }
                        }
                    }
                    black_box(traded)
                })
            })
        });
    }

    group.finish();
}

fn sample_entry_order(i: usize) -> Order {
    Order::new_entry(
        Uuid::new_v4(),
        format!("TokenMint{i:032}"),
        Decimal::new(1, 0),
        Decimal::new(1, 2),
        100,
        3,
        "balanced".to_string(),
        ConvictionTier::Standard,
        Decimal::new(8, 1),
        true,
    )
}

fn sample_exit_order(i: usize, reason: ExitReason) -> Order {
    Order::new_exit(
        Uuid::new_v4(),
        format!("TokenMint{i:032}"),
        Decimal::new(10, 0),
        Decimal::new(1, 2),
        100,
        reason,
        3,
        true,
    )
}

/// C8: bulk enqueue of a mixed ENTRY/EXIT batch followed by a full drain,
/// confirming the heap holds up as order volume grows.
fn bench_priority_queue_bulk_drain(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("priority_queue_bulk");

    for count in [100, 1_000, 10_000].iter() {
        let mut orders = Vec::with_capacity(*count);
        for i in 0..*count {
            orders.push(if i % 5 == 0 {
                sample_exit_order(i, ExitReason::StopLoss)
            } else {
                sample_entry_order(i)
            });
        }

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("enqueue_then_drain", count), &orders, |b, orders| {
            b.iter(|| {
                rt.block_on(async {
                    let queue = OrderPriorityQueue::new(*count);
                    for order in orders {
                        queue.enqueue(order.clone()).await;
                    }
                    let mut drained = 0usize;
                    while let Some(order) = queue.dequeue().await {
                        queue.mark_complete(order.id).await;
                        drained += 1;
                    }
                    black_box(drained)
                })
            })
        });
    }

    group.finish();
}

/// Generate open positions at varying entry/current prices, the shape the
/// exit monitor walks every tick.
fn generate_positions(count: usize) -> Vec<Position> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let entry_price = Decimal::new(rng.gen_range(30..70), 2);
            Position::open(
                Uuid::new_v4(),
                format!("TokenMint{i:032}"),
                entry_price,
                Decimal::new(1, 0),
                Decimal::new(rng.gen_range(1_000..100_000), 0),
                "balanced".to_string(),
                ConvictionTier::Standard,
                true,
            )
        })
        .collect()
}

/// C10: unrealized PnL recompute across every open position, run once per
/// monitor tick.
fn bench_position_pnl_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("position_pnl");

    for count in [10, 100, 1_000, 5_000].iter() {
        let positions = generate_positions(*count);
        let current_price = Decimal::new(55, 2);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("unrealized_pnl_all", count), &positions, |b, positions| {
            b.iter(|| {
                let pnls: Vec<Decimal> = positions.iter().map(|p| p.unrealized_pnl_sol(current_price)).collect();
                black_box(pnls)
            })
        });
    }

    group.finish();
}

/// Bulk JSON serialization throughput for signal-log entries flushed in a
/// single batch.
fn bench_signal_log_batch_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("signal_log_batch_serialization");

    for count in [10, 100, 500, 2_000].iter() {
        let (events, _wallets) = generate_signal_batch(*count);

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("serialize_batch", count), &events, |b, events| {
            b.iter(|| {
                let serialized: Vec<_> = events.iter().map(|e| serde_json::to_string(e).unwrap()).collect();
                black_box(serialized)
            })
        });
    }

    group.finish();
}

/// Concurrent `DashMap` fill, the access pattern the wallet cache sees while
/// warming up against a burst of distinct wallets.
fn bench_dashmap_bulk_updates(c: &mut Criterion) {
    use dashmap::DashMap;

    let mut group = c.benchmark_group("dashmap_bulk");

    for count in [100, 500, 1_000, 5_000].iter() {
        let mut rng = rand::thread_rng();
        let entries: Vec<(String, WalletMeta)> = (0..*count)
            .map(|i| {
                let wallet = format!("wallet_{i}");
                let meta = WalletMeta {
                    wallet: wallet.clone(),
                    is_monitored: true,
                    is_blacklisted: false,
                    reputation: Decimal::new(rng.gen_range(30..99), 2),
                    cluster_id: None,
                    is_leader: false,
                    cached_at: Utc::now(),
                    ttl: Duration::from_secs(300),
                };
                (wallet, meta)
            })
            .collect();

        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("fill", count), &entries, |b, entries| {
            b.iter(|| {
                let cache: DashMap<String, WalletMeta> = DashMap::new();
                for (wallet, meta) in entries {
                    cache.insert(wallet.clone(), meta.clone());
                }
                black_box(cache)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_signal_pipeline_throughput,
    bench_priority_queue_bulk_drain,
    bench_position_pnl_throughput,
    bench_signal_log_batch_serialization,
    bench_dashmap_bulk_updates,
);

criterion_main!(benches);
