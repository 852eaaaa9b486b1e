//! Seed the catalog with sample products for local development.

use tracing::info;

use marigold_core::Price;
use marigold_storefront::db::{self, Store};
use marigold_storefront::models::NewProduct;

use super::migrate::database_url;

fn sample_products() -> Vec<NewProduct> {
    vec![
        NewProduct {
            name: "Block-print Kurta".to_owned(),
            price: Price::from_rupees(799),
            stock: 40,
            is_active: true,
            variants: vec!["S".to_owned(), "M".to_owned(), "L".to_owned(), "XL".to_owned()],
        },
        NewProduct {
            name: "Handloom Cotton Saree".to_owned(),
            price: Price::from_rupees(1899),
            stock: 15,
            is_active: true,
            variants: Vec::new(),
        },
        NewProduct {
            name: "Jaipuri Mojari".to_owned(),
            price: Price::from_rupees(1299),
            stock: 25,
            is_active: true,
            variants: vec!["7".to_owned(), "8".to_owned(), "9".to_owned(), "10".to_owned()],
        },
        NewProduct {
            name: "Brass Diya Set".to_owned(),
            price: Price::from_rupees(349),
            stock: 60,
            is_active: true,
            variants: Vec::new(),
        },
        NewProduct {
            name: "Marigold Gift Card".to_owned(),
            price: Price::from_rupees(500),
            stock: 1000,
            is_active: false,
            variants: Vec::new(),
        },
    ]
}

/// Insert the sample catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn catalog() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let url = database_url()?;
    let pool = db::create_pool(&url).await?;
    let store = Store::postgres(pool);

    for product in sample_products() {
        let name = product.name.clone();
        let inserted = store.products.insert(product).await?;
        info!(product_id = %inserted.id, name, "Product seeded");
    }

    info!("Catalog seeded");
    Ok(())
}
