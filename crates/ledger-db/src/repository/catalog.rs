//! # Catalog Repository
//!
//! Products, variants, attributes and lots, written as one nested tree.
//!
//! ## Create Product
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate whole tree (pure)                                            │
//! │       │                                                                 │
//! │  BEGIN, lock tenant                                                    │
//! │       │                                                                 │
//! │  same (name, category) in tenant?      → DuplicateProduct              │
//! │       │                                                                 │
//! │  for each variant:                                                     │
//! │    same attribute set + identical lot? → DuplicateStock                │
//! │    SKU + EAN-13 barcode, retried until unique → IdentifierExhausted    │
//! │    attributes                                                          │
//! │    for each lot: insert, mirror into general warehouse                 │
//! │       │                                                                 │
//! │  COMMIT (any failure above leaves nothing behind)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::inventory::{lot_is_distributed, sync_from_lot};
use crate::repository::{fetch_scoped, lock_tenant};
use ledger_core::codes;
use ledger_core::validation::{
    attribute_key, describe_attributes, validate_attributes, validate_create_product, validate_lot,
    validate_lot_update, validate_update_product,
};
use ledger_core::{
    Attribute, AttributeInput, CoreError, CreateLotRequest, CreateProductRequest,
    CreateVariantRequest, Lot, LotChange, Money, Product, ProductTree, UpdateLotRequest,
    UpdateProductRequest, Variant, VariantChange, VariantTree,
};

/// Repository for catalog operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
    identifier_attempts: u32,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool, identifier_attempts: u32) -> Self {
        CatalogRepository {
            pool,
            identifier_attempts: identifier_attempts.max(1),
        }
    }

    /// Creates a product with its variants, attributes and lots.
    ///
    /// Each lot's quantity lands in the default section of the tenant's
    /// general warehouse.
    ///
    /// ## Returns
    /// * `DuplicateProduct` - same name and category already exist
    /// * `DuplicateStock` - an identical variant and lot already exist
    /// * `Configuration` - a lot has stock but the tenant has no general
    ///   warehouse
    pub async fn create_product(
        &self,
        tenant_id: i64,
        req: &CreateProductRequest,
    ) -> DbResult<ProductTree> {
        validate_create_product(req)?;
        debug!(tenant_id, name = %req.name, variants = req.variants.len(), "Creating product");

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        ensure_unique_product(&mut *tx, tenant_id, &req.name, &req.category, None).await?;

        let now = Utc::now();
        let product: Product = sqlx::query_as(
            r#"
            INSERT INTO products (
                tenant_id, name, category, unit, threshold_value, currency, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(req.name.trim())
        .bind(req.category.trim())
        .bind(req.unit.as_deref())
        .bind(req.threshold_value)
        .bind(req.currency)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        for variant in &req.variants {
            self.insert_variant(&mut *tx, &product, variant).await?;
        }

        let tree = load_tree(&mut *tx, product).await?;
        tx.commit().await?;

        info!(
            tenant_id,
            product_id = tree.product.id,
            variants = tree.variants.len(),
            "Product created"
        );
        Ok(tree)
    }

    /// Applies a nested edit: product fields, new variants, attribute
    /// replacement, new lots and lot patches.
    ///
    /// ## Returns
    /// * `InvalidState` - a quantity change on a lot already distributed
    ///   to stores
    pub async fn update_product(
        &self,
        tenant_id: i64,
        product_id: i64,
        req: &UpdateProductRequest,
    ) -> DbResult<ProductTree> {
        validate_update_product(req)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let current: Product = fetch_scoped(&mut *tx, product_id, tenant_id).await?;

        let name = req.name.as_deref().unwrap_or(&current.name).trim().to_string();
        let category = req
            .category
            .as_deref()
            .unwrap_or(&current.category)
            .trim()
            .to_string();
        if req.name.is_some() || req.category.is_some() {
            ensure_unique_product(&mut *tx, tenant_id, &name, &category, Some(current.id)).await?;
        }

        let product: Product = sqlx::query_as(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                unit = ?4,
                threshold_value = ?5,
                currency = ?6,
                updated_at = ?7
            WHERE id = ?1
            RETURNING *
            "#,
        )
        .bind(current.id)
        .bind(&name)
        .bind(&category)
        .bind(req.unit.as_deref().or(current.unit.as_deref()))
        .bind(req.threshold_value.unwrap_or(current.threshold_value))
        .bind(req.currency.unwrap_or(current.currency))
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        for change in &req.variants {
            match change {
                VariantChange::Create(variant) => {
                    self.insert_variant(&mut *tx, &product, variant).await?;
                }
                VariantChange::Update {
                    id,
                    attributes,
                    lots,
                } => {
                    let variant = variant_of(&mut *tx, tenant_id, product.id, *id).await?;
                    if let Some(attributes) = attributes {
                        replace_attributes(&mut *tx, variant.id, attributes).await?;
                    }
                    for lot in lots {
                        match lot {
                            LotChange::Create(lot) => {
                                insert_lot(&mut *tx, &variant, lot).await?;
                            }
                            LotChange::Update { id, patch } => {
                                let existing: Lot = fetch_scoped(&mut *tx, *id, tenant_id).await?;
                                if existing.variant_id != variant.id {
                                    return Err(CoreError::not_found(
                                        "Lot",
                                        format!("{} of variant {}", id, variant.id),
                                    )
                                    .into());
                                }
                                apply_lot_update(&mut *tx, existing, patch).await?;
                            }
                        }
                    }
                }
            }
        }

        let tree = load_tree(&mut *tx, product).await?;
        tx.commit().await?;

        info!(tenant_id, product_id, "Product updated");
        Ok(tree)
    }

    /// Patches one lot. A quantity change is mirrored into the general
    /// warehouse and refused once the lot has been distributed.
    pub async fn update_lot(
        &self,
        tenant_id: i64,
        lot_id: i64,
        patch: &UpdateLotRequest,
    ) -> DbResult<Lot> {
        validate_lot_update(patch)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let existing: Lot = fetch_scoped(&mut *tx, lot_id, tenant_id).await?;
        let lot = apply_lot_update(&mut *tx, existing, patch).await?;

        tx.commit().await?;
        Ok(lot)
    }

    /// Adds a new lot to an existing variant.
    pub async fn restock(
        &self,
        tenant_id: i64,
        product_id: i64,
        variant_id: i64,
        lot: &CreateLotRequest,
    ) -> DbResult<Lot> {
        validate_lot(lot)?;

        let mut tx = self.pool.begin().await?;
        lock_tenant(&mut *tx, tenant_id).await?;

        let variant = variant_of(&mut *tx, tenant_id, product_id, variant_id).await?;
        let created = insert_lot(&mut *tx, &variant, lot).await?;

        tx.commit().await?;

        info!(
            tenant_id,
            product_id,
            lot_id = created.id,
            quantity = created.quantity,
            "Product restocked"
        );
        Ok(created)
    }

    pub async fn get_product(&self, tenant_id: i64, product_id: i64) -> DbResult<ProductTree> {
        let mut conn = self.pool.acquire().await?;
        let product: Product = fetch_scoped(&mut *conn, product_id, tenant_id).await?;
        load_tree(&mut *conn, product).await
    }

    pub async fn list_products(&self, tenant_id: i64) -> DbResult<Vec<Product>> {
        let products =
            sqlx::query_as("SELECT * FROM products WHERE tenant_id = ?1 ORDER BY name, id")
                .bind(tenant_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(products)
    }

    /// Lots of the tenant, newest first; limited to one product when given.
    pub async fn list_lots(&self, tenant_id: i64, product_id: Option<i64>) -> DbResult<Vec<Lot>> {
        let lots = sqlx::query_as(
            r#"
            SELECT * FROM lots
            WHERE tenant_id = ?1 AND (?2 IS NULL OR product_id = ?2)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(tenant_id)
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(lots)
    }

    pub async fn get_lot(&self, tenant_id: i64, lot_id: i64) -> DbResult<Lot> {
        let mut conn = self.pool.acquire().await?;
        fetch_scoped(&mut *conn, lot_id, tenant_id).await
    }

    async fn insert_variant(
        &self,
        conn: &mut SqliteConnection,
        product: &Product,
        req: &CreateVariantRequest,
    ) -> DbResult<Variant> {
        if !req.attributes.is_empty() {
            for lot in &req.lots {
                if let Some(variant_id) =
                    find_duplicate_stock(conn, product.tenant_id, &req.attributes, lot).await?
                {
                    return Err(CoreError::DuplicateStock {
                        attributes: describe_attributes(&req.attributes),
                        variant_id,
                    }
                    .into());
                }
            }
        }

        let (sku, barcode) = unique_identifiers(
            conn,
            &product.category,
            self.identifier_attempts,
            Uuid::new_v4,
        )
        .await?;

        let variant: Variant = sqlx::query_as(
            r#"
            INSERT INTO variants (tenant_id, product_id, sku, barcode, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            RETURNING *
            "#,
        )
        .bind(product.tenant_id)
        .bind(product.id)
        .bind(&sku)
        .bind(&barcode)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;

        insert_attributes(conn, variant.id, &req.attributes).await?;
        for lot in &req.lots {
            insert_lot(conn, &variant, lot).await?;
        }

        debug!(variant_id = variant.id, sku = %variant.sku, "Variant created");
        Ok(variant)
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// A SKU and barcode no variant uses yet, derived from `next_token`.
///
/// ## Returns
/// * `IdentifierExhausted` - every one of `attempts` tokens collided
async fn unique_identifiers(
    conn: &mut SqliteConnection,
    category: &str,
    attempts: u32,
    mut next_token: impl FnMut() -> Uuid,
) -> DbResult<(String, String)> {
    for attempt in 1..=attempts {
        let token = next_token();
        let sku = codes::sku(category, &token.simple().to_string());

        let mut seed = [0u8; 8];
        seed.copy_from_slice(&token.as_bytes()[8..]);
        let barcode = codes::ean13(u64::from_le_bytes(seed));

        let taken: i64 = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM variants WHERE sku = ?1 OR barcode = ?2)",
        )
        .bind(&sku)
        .bind(&barcode)
        .fetch_one(&mut *conn)
        .await?;

        if taken == 0 {
            return Ok((sku, barcode));
        }
        warn!(attempt, sku = %sku, "Generated identifier already in use, retrying");
    }

    Err(CoreError::IdentifierExhausted {
        kind: "SKU".to_string(),
        attempts,
    }
    .into())
}

async fn ensure_unique_product(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    name: &str,
    category: &str,
    except: Option<i64>,
) -> DbResult<()> {
    // name and category are NOCASE columns
    let existing: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM products
        WHERE tenant_id = ?1 AND name = ?2 AND category = ?3 AND (?4 IS NULL OR id <> ?4)
        "#,
    )
    .bind(tenant_id)
    .bind(name.trim())
    .bind(category.trim())
    .bind(except)
    .fetch_optional(&mut *conn)
    .await?;

    if existing.is_some() {
        return Err(CoreError::DuplicateProduct {
            name: name.trim().to_string(),
            category: category.trim().to_string(),
        }
        .into());
    }
    Ok(())
}

/// A tenant variant with the same attribute set that already holds a lot
/// with the same prices and dates.
async fn find_duplicate_stock(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    attributes: &[AttributeInput],
    lot: &CreateLotRequest,
) -> DbResult<Option<i64>> {
    let rows: Vec<(i64, String, String)> = sqlx::query_as(
        r#"
        SELECT a.variant_id, a.name, a.value
        FROM variant_attributes a
        JOIN variants v ON v.id = a.variant_id
        WHERE v.tenant_id = ?1
          AND EXISTS (
              SELECT 1 FROM lots l
              WHERE l.variant_id = v.id
                AND l.purchase_price_cents = ?2
                AND l.wholesale_price_cents = ?3
                AND l.retail_price_cents = ?4
                AND l.purchase_date = ?5
                AND l.expired_date IS ?6
          )
        ORDER BY a.variant_id
        "#,
    )
    .bind(tenant_id)
    .bind(lot.purchase_price.cents())
    .bind(lot.wholesale_price.cents())
    .bind(lot.retail_price.cents())
    .bind(lot.purchase_date)
    .bind(lot.expired_date)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_variant: BTreeMap<i64, Vec<AttributeInput>> = BTreeMap::new();
    for (variant_id, name, value) in rows {
        by_variant
            .entry(variant_id)
            .or_default()
            .push(AttributeInput { name, value });
    }

    let wanted = attribute_key(attributes);
    Ok(by_variant
        .into_iter()
        .find(|(_, attrs)| attribute_key(attrs) == wanted)
        .map(|(variant_id, _)| variant_id))
}

async fn variant_of(
    conn: &mut SqliteConnection,
    tenant_id: i64,
    product_id: i64,
    variant_id: i64,
) -> DbResult<Variant> {
    let variant: Variant = fetch_scoped(conn, variant_id, tenant_id).await?;
    if variant.product_id != product_id {
        return Err(CoreError::not_found(
            "Variant",
            format!("{} of product {}", variant_id, product_id),
        )
        .into());
    }
    Ok(variant)
}

async fn insert_attributes(
    conn: &mut SqliteConnection,
    variant_id: i64,
    attributes: &[AttributeInput],
) -> DbResult<()> {
    for attr in attributes {
        sqlx::query("INSERT INTO variant_attributes (variant_id, name, value) VALUES (?1, ?2, ?3)")
            .bind(variant_id)
            .bind(attr.name.trim())
            .bind(attr.value.trim())
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn replace_attributes(
    conn: &mut SqliteConnection,
    variant_id: i64,
    attributes: &[AttributeInput],
) -> DbResult<()> {
    validate_attributes(attributes)?;
    sqlx::query("DELETE FROM variant_attributes WHERE variant_id = ?1")
        .bind(variant_id)
        .execute(&mut *conn)
        .await?;
    insert_attributes(conn, variant_id, attributes).await
}

/// Inserts a lot and mirrors its quantity into the general warehouse.
async fn insert_lot(
    conn: &mut SqliteConnection,
    variant: &Variant,
    req: &CreateLotRequest,
) -> DbResult<Lot> {
    let now = Utc::now();
    let lot: Lot = sqlx::query_as(
        r#"
        INSERT INTO lots (
            tenant_id, product_id, variant_id, lot_number, quantity, expired_date,
            purchase_price_cents, wholesale_quantity, wholesale_price_cents,
            retail_price_cents, purchase_date, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
        RETURNING *
        "#,
    )
    .bind(variant.tenant_id)
    .bind(variant.product_id)
    .bind(variant.id)
    .bind(req.lot_number.trim())
    .bind(req.quantity)
    .bind(req.expired_date)
    .bind(req.purchase_price.cents())
    .bind(req.wholesale_quantity)
    .bind(req.wholesale_price.cents())
    .bind(req.retail_price.cents())
    .bind(req.purchase_date)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    sync_from_lot(conn, &lot, lot.quantity).await?;
    Ok(lot)
}

async fn apply_lot_update(
    conn: &mut SqliteConnection,
    lot: Lot,
    patch: &UpdateLotRequest,
) -> DbResult<Lot> {
    let merged = CreateLotRequest {
        lot_number: patch.lot_number.clone().unwrap_or_else(|| lot.lot_number.clone()),
        quantity: patch.quantity.unwrap_or(lot.quantity),
        expired_date: patch.expired_date.unwrap_or(lot.expired_date),
        purchase_price: patch
            .purchase_price
            .unwrap_or(Money::from_cents(lot.purchase_price_cents)),
        wholesale_quantity: patch.wholesale_quantity.unwrap_or(lot.wholesale_quantity),
        wholesale_price: patch
            .wholesale_price
            .unwrap_or(Money::from_cents(lot.wholesale_price_cents)),
        retail_price: patch.retail_price.unwrap_or(lot.retail_price()),
        purchase_date: patch.purchase_date.unwrap_or(lot.purchase_date),
    };
    validate_lot(&merged)?;

    let delta = merged.quantity - lot.quantity;
    if delta != 0 && lot_is_distributed(conn, &lot).await? {
        return Err(CoreError::invalid_state(
            "Lot",
            lot.id,
            "distributed to stores",
            "change quantity",
        )
        .into());
    }

    let updated: Lot = sqlx::query_as(
        r#"
        UPDATE lots SET
            lot_number = ?2,
            quantity = ?3,
            expired_date = ?4,
            purchase_price_cents = ?5,
            wholesale_quantity = ?6,
            wholesale_price_cents = ?7,
            retail_price_cents = ?8,
            purchase_date = ?9,
            updated_at = ?10
        WHERE id = ?1
        RETURNING *
        "#,
    )
    .bind(lot.id)
    .bind(merged.lot_number.trim())
    .bind(merged.quantity)
    .bind(merged.expired_date)
    .bind(merged.purchase_price.cents())
    .bind(merged.wholesale_quantity)
    .bind(merged.wholesale_price.cents())
    .bind(merged.retail_price.cents())
    .bind(merged.purchase_date)
    .bind(Utc::now())
    .fetch_one(&mut *conn)
    .await?;

    sync_from_lot(conn, &updated, delta).await?;

    debug!(lot_id = updated.id, delta, "Lot updated");
    Ok(updated)
}

async fn load_tree(conn: &mut SqliteConnection, product: Product) -> DbResult<ProductTree> {
    let variants: Vec<Variant> =
        sqlx::query_as("SELECT * FROM variants WHERE product_id = ?1 ORDER BY id")
            .bind(product.id)
            .fetch_all(&mut *conn)
            .await?;

    let mut trees = Vec::with_capacity(variants.len());
    for variant in variants {
        let attributes: Vec<Attribute> =
            sqlx::query_as("SELECT * FROM variant_attributes WHERE variant_id = ?1 ORDER BY id")
                .bind(variant.id)
                .fetch_all(&mut *conn)
                .await?;
        let lots: Vec<Lot> = sqlx::query_as(
            "SELECT * FROM lots WHERE variant_id = ?1 ORDER BY purchase_date, id",
        )
        .bind(variant.id)
        .fetch_all(&mut *conn)
        .await?;
        trees.push(VariantTree {
            variant,
            attributes,
            lots,
        });
    }

    Ok(ProductTree {
        product,
        variants: trees,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
