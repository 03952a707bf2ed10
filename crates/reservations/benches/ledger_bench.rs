use common::{ItemId, LocationId, Quantity, SystemClock};
use criterion::{Criterion, criterion_group, criterion_main};
use reservations::{InMemoryReservationStore, ReservationLedger, ReservationRequest};
use stock_store::{InMemoryStockStore, NewStockRecord, StockKey, StockPolicy, StockStore};

type BenchLedger = ReservationLedger<InMemoryStockStore, InMemoryReservationStore, SystemClock>;

async fn seeded_ledger(on_hand: i64) -> (BenchLedger, common::StockRecordId) {
    let stock = InMemoryStockStore::new();
    let record = stock
        .create_if_absent(NewStockRecord::new(
            StockKey::new(ItemId::new(), LocationId::new()),
            Quantity::new(on_hand),
        ))
        .await
        .unwrap();
    let ledger = ReservationLedger::new(stock, InMemoryReservationStore::new(), SystemClock);
    (ledger, record.id)
}

fn bench_create_reservation(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/create_reservation", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (ledger, record_id) = seeded_ledger(1_000_000).await;
                ledger
                    .create(
                        ReservationRequest::new(record_id, Quantity::new(10), "bench"),
                        StockPolicy::deny_negative(),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_create_and_release(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/create_and_release", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (ledger, record_id) = seeded_ledger(1_000_000).await;
                let reservation = ledger
                    .create(
                        ReservationRequest::new(record_id, Quantity::new(10), "bench"),
                        StockPolicy::deny_negative(),
                    )
                    .await
                    .unwrap();
                ledger.release(reservation.id, None).await.unwrap();
            });
        });
    });
}

fn bench_create_and_consume(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("ledger/create_and_consume", |b| {
        b.iter(|| {
            rt.block_on(async {
                let (ledger, record_id) = seeded_ledger(1_000_000).await;
                let reservation = ledger
                    .create(
                        ReservationRequest::new(record_id, Quantity::new(10), "bench"),
                        StockPolicy::deny_negative(),
                    )
                    .await
                    .unwrap();
                ledger.consume(reservation.id).await.unwrap();
            });
        });
    });
}

fn bench_list_for_record_100(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let (ledger, record_id) = rt.block_on(async {
        let (ledger, record_id) = seeded_ledger(1_000_000).await;
        for _ in 0..100 {
            ledger
                .create(
                    ReservationRequest::new(record_id, Quantity::new(1), "bench"),
                    StockPolicy::deny_negative(),
                )
                .await
                .unwrap();
        }
        (ledger, record_id)
    });

    c.bench_function("ledger/list_for_record_100", |b| {
        b.iter(|| {
            rt.block_on(async {
                let reservations = ledger.list_for_record(record_id).await.unwrap();
                assert_eq!(reservations.len(), 100);
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_reservation,
    bench_create_and_release,
    bench_create_and_consume,
    bench_list_for_record_100,
);
criterion_main!(benches);
