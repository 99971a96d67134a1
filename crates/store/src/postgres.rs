use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Postgres, Row, postgres::PgRow};

use crate::store::{Store, StoreTransaction, lock_order};
use crate::{
    Money, NewOrder, NewProduct, Order, OrderId, OrderLine, OrderStatus, Product, ProductId,
    Result, StoreError, UserId,
};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price_cents, quantity, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, order_number, status, total_price_cents, \
     payment_reference, paid_at, created_at, updated_at";

/// Which orders to load.
enum OrderFilter<'a> {
    All,
    Id(OrderId),
    User(UserId),
    Latest,
    PaymentReference(&'a str),
}

/// PostgreSQL-backed store implementation.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs the database migrations.
    #[tracing::instrument(skip(self))]
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn quantity_from_db(value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidRecord(format!("negative quantity {value}")))
}

fn quantity_to_db(value: u32) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("quantity {value} out of range")))
}

fn row_to_product(row: &PgRow) -> Result<Product> {
    Ok(Product {
        id: ProductId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: Money::from_cents(row.try_get("price_cents")?),
        quantity: quantity_from_db(row.try_get("quantity")?)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_order(row: &PgRow) -> Result<Order> {
    let status_code: i16 = row.try_get("status")?;
    let status = OrderStatus::from_code(status_code)
        .map_err(|e| StoreError::InvalidRecord(e.to_string()))?;

    Ok(Order {
        id: OrderId::new(row.try_get("id")?),
        user_id: UserId::new(row.try_get("user_id")?),
        order_number: row.try_get("order_number")?,
        status,
        total_price: Money::from_cents(row.try_get("total_price_cents")?),
        payment_reference: row.try_get("payment_reference")?,
        paid_at: row.try_get("paid_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        lines: Vec::new(),
    })
}

async fn fetch_products(
    conn: &mut PgConnection,
    ids: &[ProductId],
    for_update: bool,
) -> Result<Vec<Product>> {
    let ids: Vec<i64> = lock_order(ids).into_iter().map(i64::from).collect();
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id{}",
        if for_update { " FOR UPDATE" } else { "" }
    );

    let rows = sqlx::query(&sql).bind(&ids).fetch_all(&mut *conn).await?;
    rows.iter().map(row_to_product).collect()
}

/// Loads order headers matching the filter and batch-loads their lines.
async fn fetch_orders(
    conn: &mut PgConnection,
    filter: OrderFilter<'_>,
    for_update: bool,
) -> Result<Vec<Order>> {
    let clause = match filter {
        OrderFilter::All => "ORDER BY id ASC",
        OrderFilter::Id(_) => "WHERE id = $1",
        OrderFilter::User(_) => "WHERE user_id = $1 ORDER BY id ASC",
        OrderFilter::Latest => "ORDER BY id DESC LIMIT 1",
        OrderFilter::PaymentReference(_) => "WHERE payment_reference = $1",
    };
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders {clause}{}",
        if for_update { " FOR UPDATE" } else { "" }
    );

    let query = sqlx::query(&sql);
    let query = match filter {
        OrderFilter::All | OrderFilter::Latest => query,
        OrderFilter::Id(id) => query.bind(id.as_i64()),
        OrderFilter::User(user_id) => query.bind(user_id.as_i64()),
        OrderFilter::PaymentReference(reference) => query.bind(reference),
    };

    let rows = query.fetch_all(&mut *conn).await?;
    let mut orders = rows.iter().map(row_to_order).collect::<Result<Vec<_>>>()?;
    if orders.is_empty() {
        return Ok(orders);
    }

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id.as_i64()).collect();
    let line_rows = sqlx::query(
        r#"
        SELECT op.order_id, op.product_id, op.quantity, op.created_at, p.name, p.price_cents
        FROM order_products op
        JOIN products p ON p.id = op.product_id
        WHERE op.order_id = ANY($1)
        ORDER BY op.id ASC
        "#,
    )
    .bind(&order_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines: HashMap<OrderId, Vec<OrderLine>> = HashMap::new();
    for row in &line_rows {
        let line = OrderLine {
            order_id: OrderId::new(row.try_get("order_id")?),
            product_id: ProductId::new(row.try_get("product_id")?),
            product_name: row.try_get("name")?,
            unit_price: Money::from_cents(row.try_get("price_cents")?),
            quantity: quantity_from_db(row.try_get("quantity")?)?,
            created_at: row.try_get("created_at")?,
        };
        lines.entry(line.order_id).or_default().push(line);
    }

    for order in &mut orders {
        order.lines = lines.remove(&order.id).unwrap_or_default();
    }

    Ok(orders)
}

async fn fetch_one_order(
    conn: &mut PgConnection,
    filter: OrderFilter<'_>,
    for_update: bool,
) -> Result<Option<Order>> {
    Ok(fetch_orders(conn, filter, for_update).await?.into_iter().next())
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn insert_product(&self, product: NewProduct) -> Result<Product> {
        let sql = format!(
            "INSERT INTO products (name, description, price_cents, quantity) \
             VALUES ($1, $2, $3, $4) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.price.cents())
            .bind(quantity_to_db(product.quantity)?)
            .fetch_one(&self.pool)
            .await?;

        row_to_product(&row)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_products(&mut conn, &[id], false).await?.into_iter().next())
    }

    async fn get_products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_products(&mut conn, ids, false).await
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one_order(&mut conn, OrderFilter::Id(id), false).await
    }

    async fn find_latest_order(&self) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one_order(&mut conn, OrderFilter::Latest, false).await
    }

    async fn find_order_by_payment_reference(&self, reference: &str) -> Result<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_one_order(&mut conn, OrderFilter::PaymentReference(reference), false).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_orders(&mut conn, OrderFilter::All, false).await
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_orders(&mut conn, OrderFilter::User(user_id), false).await
    }

    async fn set_payment_reference(&self, id: OrderId, reference: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET payment_reference = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id.as_i64())
        .bind(reference)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }
}

/// Transaction over a [`PostgresStore`]. Rolled back when dropped uncommitted.
pub struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl StoreTransaction for PostgresTransaction {
    async fn lock_products(&mut self, ids: &[ProductId]) -> Result<Vec<Product>> {
        fetch_products(&mut self.tx, ids, true).await
    }

    async fn decrement_product_quantity(&mut self, id: ProductId, by: u32) -> Result<u32> {
        let by_db = quantity_to_db(by)?;
        let remaining: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity - $2, updated_at = NOW()
            WHERE id = $1 AND quantity >= $2
            RETURNING quantity
            "#,
        )
        .bind(id.as_i64())
        .bind(by_db)
        .fetch_optional(&mut *self.tx)
        .await?;

        if let Some(remaining) = remaining {
            return quantity_from_db(remaining);
        }

        // The guarded update matched nothing: report why.
        let available: Option<i32> =
            sqlx::query_scalar("SELECT quantity FROM products WHERE id = $1")
                .bind(id.as_i64())
                .fetch_optional(&mut *self.tx)
                .await?;

        match available {
            Some(available) => {
                tracing::warn!(product_id = %id, requested = by, available, "stock conflict");
                Err(StoreError::StockConflict {
                    product_id: id,
                    requested: by,
                    available: quantity_from_db(available)?,
                })
            }
            None => Err(StoreError::ProductNotFound(id)),
        }
    }

    async fn increment_product_quantity(&mut self, id: ProductId, by: u32) -> Result<u32> {
        let quantity: Option<i32> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity + $2, updated_at = NOW()
            WHERE id = $1
            RETURNING quantity
            "#,
        )
        .bind(id.as_i64())
        .bind(quantity_to_db(by)?)
        .fetch_optional(&mut *self.tx)
        .await?;

        quantity
            .ok_or(StoreError::ProductNotFound(id))
            .and_then(quantity_from_db)
    }

    async fn insert_order(&mut self, order: NewOrder) -> Result<Order> {
        let sql = format!(
            "INSERT INTO orders (user_id, order_number, status, total_price_cents) \
             VALUES ($1, $2, $3, $4) RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(order.user_id.as_i64())
            .bind(&order.order_number)
            .bind(order.status.code())
            .bind(order.total_price.cents())
            .fetch_one(&mut *self.tx)
            .await?;

        row_to_order(&row)
    }

    async fn insert_order_line(
        &mut self,
        order_id: OrderId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<()> {
        sqlx::query("INSERT INTO order_products (order_id, product_id, quantity) VALUES ($1, $2, $3)")
            .bind(order_id.as_i64())
            .bind(product_id.as_i64())
            .bind(quantity_to_db(quantity)?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db_err) = e
                    && db_err.is_foreign_key_violation()
                {
                    return StoreError::ProductNotFound(product_id);
                }
                StoreError::Database(e)
            })?;

        Ok(())
    }

    async fn lock_order(&mut self, id: OrderId) -> Result<Option<Order>> {
        fetch_one_order(&mut self.tx, OrderFilter::Id(id), true).await
    }

    async fn mark_order_paid(&mut self, id: OrderId, paid_at: DateTime<Utc>) -> Result<()> {
        let result =
            sqlx::query("UPDATE orders SET paid_at = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_i64())
                .bind(paid_at)
                .execute(&mut *self.tx)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<()> {
        // order_products rows go with the ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id.as_i64())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::OrderNotFound(id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
