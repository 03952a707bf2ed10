use common::{ItemId, LocationId, Quantity};
use criterion::{Criterion, criterion_group, criterion_main};
use stock_store::{InMemoryStockStore, NewStockRecord, StockFilter, StockKey, StockPolicy, StockStore};

fn make_record(on_hand: i64) -> NewStockRecord {
    NewStockRecord::new(
        StockKey::new(ItemId::new(), LocationId::new()),
        Quantity::new(on_hand),
    )
}

fn bench_create_record(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("stock_store/create_record", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStockStore::new();
                store.create_if_absent(make_record(100)).await.unwrap();
            });
        });
    });
}

fn bench_apply_delta(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("stock_store/apply_delta", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStockStore::new();
                let record = store.create_if_absent(make_record(1000)).await.unwrap();
                let mut version = record.version;
                for _ in 0..10 {
                    let updated = store
                        .apply_delta(
                            record.id,
                            Quantity::new(-10),
                            version,
                            StockPolicy::deny_negative(),
                        )
                        .await
                        .unwrap();
                    version = updated.version;
                }
            });
        });
    });
}

fn bench_set_reserved(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("stock_store/set_reserved", |b| {
        b.iter(|| {
            rt.block_on(async {
                let store = InMemoryStockStore::new();
                let record = store.create_if_absent(make_record(100)).await.unwrap();
                store
                    .set_reserved(
                        record.id,
                        Quantity::new(50),
                        record.version,
                        StockPolicy::deny_negative(),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

fn bench_list_100_records(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStockStore::new();

    // Pre-populate with 100 records
    rt.block_on(async {
        for _ in 0..100 {
            store.create_if_absent(make_record(10)).await.unwrap();
        }
    });

    c.bench_function("stock_store/list_100_records", |b| {
        b.iter(|| {
            rt.block_on(async {
                let records = store.list(StockFilter::all()).await.unwrap();
                assert_eq!(records.len(), 100);
            });
        });
    });
}

fn bench_get_by_key(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStockStore::new();

    let key = StockKey::new(ItemId::new(), LocationId::new());
    rt.block_on(async {
        store
            .create_if_absent(NewStockRecord::new(key.clone(), Quantity::new(10)))
            .await
            .unwrap();
    });

    c.bench_function("stock_store/get_by_key", |b| {
        b.iter(|| {
            rt.block_on(async {
                store.get(&key).await.unwrap().unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_create_record,
    bench_apply_delta,
    bench_set_reserved,
    bench_list_100_records,
    bench_get_by_key,
);
criterion_main!(benches);
