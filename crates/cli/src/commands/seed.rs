//! Demo data for local development.
//!
//! Catalog seeding is skipped when any product already exists, so the
//! command can be re-run safely after `migrate`.

use rust_decimal::Decimal;
use sqlx::PgPool;
use techmart_core::{BrandId, CategoryId, Email, Price, UserRole};
use techmart_storefront::db::{CatalogRepository, UserRepository};
use techmart_storefront::models::catalog::{NewProduct, NewVariant};
use techmart_storefront::services::auth::{AuthService, Registration};

use super::CliError;

const CATEGORIES: &[(&str, &str)] = &[
    ("Laptops", "Notebooks and ultrabooks"),
    ("Smartphones", "Phones and phablets"),
    ("Audio", "Headphones, earbuds and speakers"),
    ("Accessories", "Mice, keyboards and chargers"),
];

const BRANDS: &[&str] = &["Apple", "Samsung", "Dell", "Sony", "Logitech"];

/// (name, category, brand, [(variant, sku, price in VND, initial stock)])
type DemoProduct = (
    &'static str,
    &'static str,
    &'static str,
    &'static [(&'static str, &'static str, i64, i32)],
);

const PRODUCTS: &[DemoProduct] = &[
    (
        "MacBook Air 13",
        "Laptops",
        "Apple",
        &[
            ("M3 / 8GB / 256GB", "MBA13-M3-8-256", 27_990_000, 15),
            ("M3 / 16GB / 512GB", "MBA13-M3-16-512", 36_990_000, 8),
        ],
    ),
    (
        "XPS 13",
        "Laptops",
        "Dell",
        &[("Core Ultra 7 / 16GB / 512GB", "XPS13-U7-16-512", 39_990_000, 6)],
    ),
    (
        "Galaxy S24",
        "Smartphones",
        "Samsung",
        &[
            ("128GB Onyx Black", "S24-128-BLK", 19_990_000, 25),
            ("256GB Marble Grey", "S24-256-GRY", 22_490_000, 12),
        ],
    ),
    (
        "iPhone 15",
        "Smartphones",
        "Apple",
        &[
            ("128GB Blue", "IP15-128-BLU", 21_990_000, 20),
            ("256GB Black", "IP15-256-BLK", 24_990_000, 10),
        ],
    ),
    (
        "WH-1000XM5",
        "Audio",
        "Sony",
        &[
            ("Black", "WH1000XM5-BLK", 8_490_000, 18),
            ("Silver", "WH1000XM5-SLV", 8_490_000, 2),
        ],
    ),
    (
        "MX Master 3S",
        "Accessories",
        "Logitech",
        &[("Graphite", "MXM3S-GRA", 2_490_000, 40)],
    ),
];

/// Insert the demo categories, brands, products and variants.
pub async fn catalog(pool: &PgPool) -> Result<(), CliError> {
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM shop.products")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        tracing::info!(products = existing, "Catalog already seeded, skipping");
        return Ok(());
    }

    let mut categories = Vec::with_capacity(CATEGORIES.len());
    for (name, description) in CATEGORIES {
        let id: CategoryId = sqlx::query_scalar(
            r"
            INSERT INTO shop.categories (name, description) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET description = EXCLUDED.description
            RETURNING id
            ",
        )
        .bind(name)
        .bind(description)
        .fetch_one(pool)
        .await?;
        categories.push((*name, id));
    }

    let mut brands = Vec::with_capacity(BRANDS.len());
    for name in BRANDS {
        let id: BrandId = sqlx::query_scalar(
            r"
            INSERT INTO shop.brands (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            ",
        )
        .bind(name)
        .fetch_one(pool)
        .await?;
        brands.push((*name, id));
    }

    let repo = CatalogRepository::new(pool);
    for (name, category, brand, variants) in PRODUCTS {
        let variants = variants
            .iter()
            .map(|(variant, sku, price, stock)| -> Result<NewVariant, CliError> {
                Ok(NewVariant {
                    name: (*variant).to_owned(),
                    sku: Some((*sku).to_owned()),
                    price: Price::new(Decimal::from(*price))
                        .map_err(|e| CliError::InvalidData(format!("{sku}: {e}")))?,
                    initial_stock: *stock,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let product = NewProduct {
            name: (*name).to_owned(),
            description: None,
            category_id: lookup(&categories, category),
            brand_id: lookup(&brands, brand),
            variants,
        };
        let id = repo.create_product(&product).await?;
        tracing::info!(product_id = %id, name, "Seeded product");
    }

    tracing::info!(products = PRODUCTS.len(), "Demo catalog seeded");
    Ok(())
}

/// Register an admin account, or promote it if the email already exists.
pub async fn admin(pool: &PgPool, email: &str, password: &str) -> Result<(), CliError> {
    let parsed = Email::parse(email).map_err(|_| CliError::InvalidEmail(email.to_owned()))?;
    let users = UserRepository::new(pool);

    if users.get_by_email(&parsed).await?.is_none() {
        AuthService::new(pool)
            .register(Registration {
                full_name: "Techmart Admin",
                email,
                phone: None,
                password,
            })
            .await?;
    }

    users.set_role(&parsed, UserRole::Admin).await?;
    tracing::info!(email = %parsed, "Admin account ready");
    Ok(())
}

fn lookup<T: Copy>(table: &[(&str, T)], name: &str) -> Option<T> {
    table.iter().find(|(n, _)| *n == name).map(|(_, id)| *id)
}
