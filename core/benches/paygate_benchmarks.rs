use chrono::Utc;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use paygate::{
  CatalogRepository, CatalogStore, InMemoryCatalogRepository, InMemoryOrderRepository, MediaRef, OrderEvent,
  OrderStore, ProductDraft, RateLimiter, SignatureVerifier, UserId,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime; // To run async code within Criterion

fn webhook_body(padding: usize) -> Vec<u8> {
  serde_json::json!({
    "status": "completed",
    "order_reference": "pg_0123456789abcdef",
    "note": "x".repeat(padding),
  })
  .to_string()
  .into_bytes()
}

// --- Benchmark Functions ---

fn bench_signature_verify(c: &mut Criterion) {
  let mut group = c.benchmark_group("SignatureVerify");
  let verifier = SignatureVerifier::new("bench-secret").unwrap();

  for padding in [0usize, 1_024, 16_384].iter() {
    let body = webhook_body(*padding);
    let signature = verifier.sign(&body);
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_with_input(BenchmarkId::from_parameter(body.len()), &body, |b, body| {
      b.iter(|| verifier.verify(body, Some(&signature)).unwrap());
    });
  }
  group.finish();
}

fn order_store(rt: &Runtime) -> (OrderStore, paygate::ProductId) {
  let catalog_repo = Arc::new(InMemoryCatalogRepository::new());
  let product = rt
    .block_on(catalog_repo.insert_new(
      ProductDraft {
        name: "Bench".to_string(),
        image: MediaRef::new("bench"),
        price: "99.00".parse().unwrap(),
        description: "bench product".to_string(),
      },
      Utc::now(),
    ))
    .unwrap();
  let catalog = CatalogStore::new(catalog_repo);
  let orders = OrderStore::new(Arc::new(InMemoryOrderRepository::new()), catalog, Duration::from_secs(3600));
  (orders, product.id)
}

fn bench_order_lifecycle(c: &mut Criterion) {
  let mut group = c.benchmark_group("OrderLifecycle");
  let rt = Runtime::new().unwrap();
  let (orders, product_id) = order_store(&rt);

  group.bench_function("create_pending_paid", |b| {
    b.to_async(&rt).iter(|| {
      let orders = orders.clone();
      let product_id = product_id.clone();
      async move {
        let order = orders.create_order(UserId(7), &product_id).await.unwrap();
        orders.transition(order.id, OrderEvent::GatewayPending).await.unwrap();
        orders.transition(order.id, OrderEvent::GatewayPaid).await.unwrap()
      }
    });
  });

  // Many tasks offering the same event to one order: measures per-order lock contention.
  for concurrency in [1usize, 8, 32].iter() {
    group.bench_with_input(
      BenchmarkId::new("duplicate_events", concurrency),
      concurrency,
      |b, &concurrency| {
        b.to_async(&rt).iter(|| {
          let orders = orders.clone();
          let product_id = product_id.clone();
          async move {
            let order = orders.create_order(UserId(9), &product_id).await.unwrap();
            orders.transition(order.id, OrderEvent::GatewayPending).await.unwrap();
            let handles: Vec<_> = (0..concurrency)
              .map(|_| {
                let orders = orders.clone();
                tokio::spawn(async move { orders.transition(order.id, OrderEvent::GatewayPaid).await })
              })
              .collect();
            for handle in handles {
              handle.await.unwrap().unwrap();
            }
          }
        });
      },
    );
  }
  group.finish();
}

fn bench_rate_limiter(c: &mut Criterion) {
  let mut group = c.benchmark_group("RateLimiter");
  for users in [10i64, 1_000, 100_000].iter() {
    let limiter = RateLimiter::new(Duration::from_secs(2));
    let now = Instant::now();
    group.throughput(Throughput::Elements(1));
    group.bench_with_input(BenchmarkId::from_parameter(users), users, |b, &users| {
      let mut next = 0i64;
      b.iter(|| {
        next = (next + 1) % users;
        limiter.allow_at(UserId(next), now)
      });
    });
  }
  group.finish();
}

criterion_group!(benches, bench_signature_verify, bench_order_lifecycle, bench_rate_limiter);
criterion_main!(benches);
