//! Deterministic demo dataset for local runs and tests.

use crate::DbPool;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SeedResult {
    pub customers: u32,
    pub products: u32,
    pub orders: u32,
    pub order_items: u32,
    pub reviews: u32,
    pub inventory_entries: u32,
}

const CUSTOMERS: &[(i64, &str, &str, &str, &str, &str, &str)] = &[
    (1, "Alice Hartmann", "alice.hartmann@example.com", "415-555-0101", "12 Pine St", "San Francisco", "US"),
    (2, "Ben Okafor", "ben.okafor@example.com", "415-555-0102", "9 Lake Ave", "Chicago", "US"),
    (3, "Chloe Martin", "chloe.martin@example.com", "415-555-0103", "33 Rue Verte", "Lyon", "FR"),
    (4, "Daniel Reyes", "daniel.reyes@example.com", "415-555-0104", "5 Calle Sol", "Madrid", "ES"),
    (5, "Emma Lindqvist", "emma.lindqvist@example.com", "415-555-0105", "8 Storgatan", "Stockholm", "SE"),
];

const PRODUCTS: &[(i64, &str, &str, f64, i64)] = &[
    (1, "Walnut Desk", "furniture", 449.0, 120),
    (2, "Ergo Chair", "furniture", 299.0, 85),
    (3, "LED Desk Lamp", "lighting", 59.0, 300),
    (4, "Monitor Arm", "accessories", 129.0, 150),
    (5, "Standing Mat", "accessories", 79.0, 200),
    (6, "Filing Cabinet", "furniture", 189.0, 40),
];

const ORDERS: &[(i64, i64, &str, &str, f64)] = &[
    (1, 1, "2026-07-02", "completed", 748.0),
    (2, 2, "2026-07-05", "completed", 299.0),
    (3, 3, "2026-07-11", "completed", 188.0),
    (4, 1, "2026-07-19", "completed", 129.0),
    (5, 4, "2026-07-23", "shipped", 638.0),
    (6, 5, "2026-08-01", "completed", 59.0),
    (7, 2, "2026-08-07", "completed", 378.0),
    (8, 3, "2026-08-14", "pending", 449.0),
];

const ORDER_ITEMS: &[(i64, i64, i64, i64, f64)] = &[
    (1, 1, 1, 1, 449.0),
    (2, 1, 2, 1, 299.0),
    (3, 2, 2, 1, 299.0),
    (4, 3, 3, 1, 59.0),
    (5, 3, 4, 1, 129.0),
    (6, 4, 4, 1, 129.0),
    (7, 5, 1, 1, 449.0),
    (8, 5, 6, 1, 189.0),
    (9, 6, 3, 1, 59.0),
    (10, 7, 6, 2, 189.0),
    (11, 8, 1, 1, 449.0),
];

const REVIEWS: &[(i64, i64, i64, i64, &str)] = &[
    (1, 1, 1, 5, "Sturdy and beautiful."),
    (2, 2, 2, 4, "Comfortable for long days."),
    (3, 3, 3, 5, "Bright and adjustable."),
    (4, 4, 1, 3, "Works, but assembly was fiddly."),
    (5, 6, 2, 4, "Solid build quality."),
];

const INVENTORY_LOG: &[(i64, i64, i64, &str)] = &[
    (1, 1, -3, "order_fulfilled"),
    (2, 2, -2, "order_fulfilled"),
    (3, 3, 50, "restock"),
    (4, 6, -2, "order_fulfilled"),
];

/// Seeds the demo schema with a fixed dataset. Idempotent: rows are
/// keyed by explicit ids and replaced on re-run.
pub async fn seed_demo_data(pool: &DbPool) -> Result<SeedResult, sqlx::Error> {
    let mut result = SeedResult::default();

    for (id, name, email, phone, address, city, country) in CUSTOMERS {
        sqlx::query(
            "INSERT OR REPLACE INTO customers (id, name, email, phone, address, city, country)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(address)
        .bind(city)
        .bind(country)
        .execute(pool)
        .await?;
        result.customers += 1;
    }

    for (id, name, category, price, stock_quantity) in PRODUCTS {
        sqlx::query(
            "INSERT OR REPLACE INTO products (id, name, category, price, stock_quantity)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(name)
        .bind(category)
        .bind(price)
        .bind(stock_quantity)
        .execute(pool)
        .await?;
        result.products += 1;
    }

    for (id, customer_id, order_date, status, total_amount) in ORDERS {
        sqlx::query(
            "INSERT OR REPLACE INTO orders (id, customer_id, order_date, status, total_amount)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(customer_id)
        .bind(order_date)
        .bind(status)
        .bind(total_amount)
        .execute(pool)
        .await?;
        result.orders += 1;
    }

    for (id, order_id, product_id, quantity, unit_price) in ORDER_ITEMS {
        sqlx::query(
            "INSERT OR REPLACE INTO order_items (id, order_id, product_id, quantity, unit_price)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price)
        .execute(pool)
        .await?;
        result.order_items += 1;
    }

    for (id, product_id, customer_id, rating, body) in REVIEWS {
        sqlx::query(
            "INSERT OR REPLACE INTO reviews (id, product_id, customer_id, rating, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(id)
        .bind(product_id)
        .bind(customer_id)
        .bind(rating)
        .bind(body)
        .execute(pool)
        .await?;
        result.reviews += 1;
    }

    for (id, product_id, quantity_change, reason) in INVENTORY_LOG {
        sqlx::query(
            "INSERT OR REPLACE INTO inventory_log (id, product_id, quantity_change, reason)
             VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(id)
        .bind(product_id)
        .bind(quantity_change)
        .bind(reason)
        .execute(pool)
        .await?;
        result.inventory_entries += 1;
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use sqlx::Row;

    use super::seed_demo_data;
    use crate::migrations::run_pending;
    use crate::connect_with_settings;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");

        let first = seed_demo_data(&pool).await.expect("first seed");
        let second = seed_demo_data(&pool).await.expect("second seed");
        assert_eq!(first, second);

        let customer_count = sqlx::query("SELECT COUNT(*) AS count FROM customers")
            .fetch_one(&pool)
            .await
            .expect("count customers")
            .get::<i64, _>("count");
        assert_eq!(customer_count, i64::from(first.customers));
    }

    #[tokio::test]
    async fn order_totals_match_their_items() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        run_pending(&pool).await.expect("run migrations");
        seed_demo_data(&pool).await.expect("seed");

        let mismatched = sqlx::query(
            "SELECT COUNT(*) AS count FROM orders o
             WHERE ABS(o.total_amount - (
                 SELECT SUM(oi.quantity * oi.unit_price)
                 FROM order_items oi WHERE oi.order_id = o.id
             )) > 0.001",
        )
        .fetch_one(&pool)
        .await
        .expect("check totals")
        .get::<i64, _>("count");

        assert_eq!(mismatched, 0);
    }
}
