use criterion::{Criterion, criterion_group, criterion_main};
use domain::{
    Money, OrderAssembler, OrderLineRequest, OrderRequest, OrderStatus, PricingCalculator,
    Product, ProductId, StockLedger, format_order_number,
};
use store::{InMemoryStore, NewProduct, Store};

fn catalog(size: i64) -> Vec<Product> {
    let now = chrono::Utc::now();
    (1..=size)
        .map(|id| Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: None,
            price: Money::from_cents(1000 + id),
            quantity: 1_000,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

fn bench_pricing(c: &mut Criterion) {
    let products = catalog(50);
    let lines: Vec<OrderLineRequest> = products
        .iter()
        .map(|p| OrderLineRequest::new(p.id, 3))
        .collect();

    c.bench_function("domain/total_price_50_lines", |b| {
        b.iter(|| PricingCalculator::total_price(&lines, &products).unwrap());
    });
}

fn bench_stock_plan(c: &mut Criterion) {
    let products = catalog(50);
    let request = OrderRequest::new(1, products.iter().map(|p| OrderLineRequest::new(p.id, 3)))
        .unwrap();
    let requested = request.quantities();

    c.bench_function("domain/stock_plan_50_lines", |b| {
        b.iter(|| StockLedger::plan(&products, &requested).unwrap());
    });
}

fn bench_order_number(c: &mut Criterion) {
    c.bench_function("domain/format_order_number", |b| {
        b.iter(|| format_order_number(1_700_000_123, 42));
    });
}

fn bench_create_order(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let store = InMemoryStore::new();
    rt.block_on(async {
        store
            .insert_product(NewProduct::new("Widget", Money::from_cents(5025), u32::MAX))
            .await
            .unwrap();
    });
    let assembler = OrderAssembler::new(store);
    let request = OrderRequest::new(1, [OrderLineRequest::new(1, 1)]).unwrap();

    c.bench_function("domain/create_order", |b| {
        b.iter(|| {
            rt.block_on(async {
                assembler
                    .create_order(
                        OrderStatus::CashOnDelivery,
                        &request,
                        "ORD-12300001".to_string(),
                    )
                    .await
                    .unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_pricing,
    bench_stock_plan,
    bench_order_number,
    bench_create_order
);
criterion_main!(benches);
