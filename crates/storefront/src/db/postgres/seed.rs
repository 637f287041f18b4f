//! Insert the demo catalog into `PostgreSQL`.
//!
//! Idempotent: rerunning resets demo stock levels and leaves everything else
//! as it is.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use crate::db::{RepositoryError, quantity_to_db};
use crate::seed::{DEMO_PROFILES, DEMO_STORES, SIZES};

/// Counts of what the seeder touched.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub stores: usize,
    pub products: usize,
    pub stock_rows: usize,
}

/// Seed stores, products, sizes, stock and customer profiles.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if any statement fails; nothing is
/// written in that case.
pub async fn seed_demo_catalog(pool: &PgPool) -> Result<SeedSummary, RepositoryError> {
    let mut tx = pool.begin().await?;
    let mut summary = SeedSummary::default();

    for label in SIZES {
        sqlx::query("INSERT INTO pazar.size (label) VALUES ($1) ON CONFLICT (label) DO NOTHING")
            .bind(*label)
            .execute(&mut *tx)
            .await?;
    }

    for store in DEMO_STORES {
        let store_id = upsert_store(&mut tx, store.name).await?;
        summary.stores += 1;

        for product in store.products {
            let product_id = upsert_product(
                &mut tx,
                store_id,
                product.name,
                Decimal::new(product.price_minor, 2),
            )
            .await?;
            summary.products += 1;

            for (label, quantity) in product.stock {
                sqlx::query(
                    r"
                    INSERT INTO pazar.stock (product_id, size_id, quantity)
                    SELECT $1, id, $3 FROM pazar.size WHERE label = $2
                    ON CONFLICT (product_id, size_id)
                    DO UPDATE SET quantity = EXCLUDED.quantity, updated_at = NOW()
                    ",
                )
                .bind(product_id)
                .bind(*label)
                .bind(quantity_to_db(*quantity)?)
                .execute(&mut *tx)
                .await?;
                summary.stock_rows += 1;
            }
        }
    }

    for (user_id, address) in DEMO_PROFILES {
        sqlx::query(
            r"
            INSERT INTO pazar.user_profile (user_id, default_address)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET default_address = EXCLUDED.default_address
            ",
        )
        .bind(*user_id)
        .bind(*address)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(summary)
}

async fn upsert_store(conn: &mut PgConnection, name: &str) -> Result<i32, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO pazar.store (name)
        VALUES ($1)
        ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
        RETURNING id
        ",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

async fn upsert_product(
    conn: &mut PgConnection,
    store_id: i32,
    name: &str,
    price: Decimal,
) -> Result<i32, RepositoryError> {
    let id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO pazar.product (store_id, name, price)
        VALUES ($1, $2, $3)
        ON CONFLICT (store_id, name) DO UPDATE SET price = EXCLUDED.price, active = TRUE
        RETURNING id
        ",
    )
    .bind(store_id)
    .bind(name)
    .bind(price)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}
