use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rust_decimal_macros::dec;
use uuid::Uuid;

use clob_engine::domain::services::events::EventSink;
use clob_engine::domain::services::matching_engine::{EngineConfig, MatchingEngine, OrderDraft, SystemClock};
use clob_engine::{OrderType, Side, TimeInForce};

fn limit_order(pair: &str, side: Side, price: rust_decimal::Decimal, qty: rust_decimal::Decimal, tif: TimeInForce) -> OrderDraft {
    OrderDraft {
        submitter_id: Uuid::new_v4(),
        pair: pair.to_string(),
        side,
        order_type: OrderType::Limit,
        quantity: qty,
        limit_price: Some(price),
        stop_price: None,
        time_in_force: tif,
    }
}

fn setup_engine() -> MatchingEngine {
    let events = Arc::new(EventSink::new(256));
    MatchingEngine::new(Arc::new(SystemClock), events, EngineConfig::default())
}

fn bench_mixed_workload(c: &mut Criterion) {
    let engine = setup_engine();
    let pair = "invoice-bench-1";
    let mut group = c.benchmark_group("mixed_workload");

    group.bench_function("realistic_mixed_operations", |b| {
        b.iter(|| {
            // 60% new resting orders
            for _ in 0..6 {
                let draft = limit_order(pair, Side::Buy, dec!(100), dec!(1), TimeInForce::Gtc);
                black_box(engine.submit(draft).unwrap());
            }

            // 20% cancellations
            for _ in 0..2 {
                let draft = limit_order(pair, Side::Sell, dec!(101), dec!(1), TimeInForce::Gtc);
                let submitter = draft.submitter_id;
                let outcome = engine.submit(draft).unwrap();
                black_box(engine.cancel(outcome.order.id, submitter).unwrap());
            }

            // 20% crossing matches
            for _ in 0..2 {
                let buy = limit_order(pair, Side::Buy, dec!(100), dec!(1), TimeInForce::Gtc);
                let sell = limit_order(pair, Side::Sell, dec!(100), dec!(1), TimeInForce::Gtc);
                black_box(engine.submit(buy).unwrap());
                black_box(engine.submit(sell).unwrap());
            }
        })
    });

    group.finish();
}

fn bench_high_frequency_matching(c: &mut Criterion) {
    let engine = setup_engine();
    let pair = "invoice-bench-2";
    let mut group = c.benchmark_group("high_frequency_matching");

    for i in 0..10 {
        let price = dec!(100) + rust_decimal::Decimal::from(i);
        for _ in 0..100 {
            engine.submit(limit_order(pair, Side::Sell, price, dec!(1), TimeInForce::Gtc)).unwrap();
        }
    }

    group.bench_function("rapid_matching", |b| {
        b.iter(|| {
            black_box(engine.submit(limit_order(pair, Side::Buy, dec!(110), dec!(5), TimeInForce::Gtc)).unwrap());
        })
    });

    group.finish();
}

fn bench_order_book_depth(c: &mut Criterion) {
    let engine = setup_engine();
    let pair = "invoice-bench-3";
    let mut group = c.benchmark_group("order_book_depth");

    for i in 0..50 {
        let price = dec!(100) + rust_decimal::Decimal::from(i);
        for _ in 0..20 {
            engine.submit(limit_order(pair, Side::Sell, price, dec!(1), TimeInForce::Gtc)).unwrap();
        }
    }

    group.bench_function("deep_book_query", |b| {
        b.iter(|| {
            black_box(engine.query_book(pair, Some(20)).unwrap());
        })
    });

    group.finish();
}

fn bench_ioc_orders(c: &mut Criterion) {
    let engine = setup_engine();
    let pair = "invoice-bench-4";
    let mut group = c.benchmark_group("ioc_orders");

    for i in 0..5 {
        let price = dec!(100) + rust_decimal::Decimal::from(i);
        engine.submit(limit_order(pair, Side::Sell, price, dec!(1), TimeInForce::Gtc)).unwrap();
    }

    group.bench_function("ioc_processing", |b| {
        b.iter(|| {
            black_box(engine.submit(limit_order(pair, Side::Buy, dec!(102), dec!(1), TimeInForce::Ioc)).unwrap());
        })
    });

    group.finish();
}

fn bench_market_orders(c: &mut Criterion) {
    let mut group = c.benchmark_group("market_orders");

    group.bench_function("market_order_processing", |b| {
        b.iter_with_setup(
            || {
                let engine = setup_engine();
                let pair = "invoice-bench-5";
                for i in 0..5 {
                    let price = dec!(100) + rust_decimal::Decimal::from(i);
                    engine.submit(limit_order(pair, Side::Sell, price, dec!(10), TimeInForce::Gtc)).unwrap();
                }
                engine
            },
            |engine| {
                let pair = "invoice-bench-5";
                let draft = OrderDraft {
                    submitter_id: Uuid::new_v4(),
                    pair: pair.to_string(),
                    side: Side::Buy,
                    order_type: OrderType::Market,
                    quantity: dec!(1),
                    limit_price: None,
                    stop_price: None,
                    time_in_force: TimeInForce::Ioc,
                };
                black_box(engine.submit(draft).unwrap())
            },
        )
    });

    group.finish();
}

fn bench_fok_precheck(c: &mut Criterion) {
    let engine = setup_engine();
    let pair = "invoice-bench-6";
    let mut group = c.benchmark_group("fok_precheck");

    for i in 0..20 {
        let price = dec!(100) + rust_decimal::Decimal::from(i);
        engine.submit(limit_order(pair, Side::Sell, price, dec!(5), TimeInForce::Gtc)).unwrap();
    }

    group.bench_function("fok_liquidity_walk", |b| {
        b.iter(|| {
            black_box(
                engine
                    .submit(limit_order(pair, Side::Buy, dec!(90), dec!(1000), TimeInForce::Fok))
                    .unwrap(),
            );
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_mixed_workload,
    bench_high_frequency_matching,
    bench_order_book_depth,
    bench_ioc_orders,
    bench_market_orders,
    bench_fok_precheck,
);
criterion_main!(benches);
