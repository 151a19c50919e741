use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;

use crate::catalog::{Product, SqliteCatalog};

/// A small catalog covering two universities and three categories.
#[must_use]
pub fn sample_products() -> Vec<Product> {
    let rows = [
        ("p1", "Desk Lamp", "Adjustable LED lamp for late-night studying", 25.0, "furniture", "Furniture", "uni-a", "v1", "Dorm Goods"),
        ("p2", "Desk Chair", "Ergonomic rolling chair", 60.0, "furniture", "Furniture", "uni-a", "v1", "Dorm Goods"),
        ("p3", "Graphing Calculator", "TI-84 in great condition", 70.0, "electronics", "Electronics", "uni-b", "v2", "Tech Resale"),
        ("p4", "Calculus Textbook", "Early transcendentals, 8th edition", 45.0, "books", "Books", "uni-a", "v3", "Campus Books"),
        ("p5", "Bike Lock", "Heavy duty U-lock with two keys", 15.0, "outdoors", "Outdoors", "uni-b", "v2", "Tech Resale"),
        ("p6", "Floor Lamp", "Tall lamp with warm light", 35.0, "furniture", "Furniture", "uni-b", "v1", "Dorm Goods"),
    ];

    rows.iter()
        .enumerate()
        .map(
            |(i, (id, title, description, price, category_id, category, university, vendor_id, vendor))| Product {
                id: (*id).to_string(),
                title: (*title).to_string(),
                description: Some((*description).to_string()),
                price: *price,
                category_id: Some((*category_id).to_string()),
                category_name: Some((*category).to_string()),
                university_id: Some((*university).to_string()),
                vendor_id: Some((*vendor_id).to_string()),
                vendor_name: Some((*vendor).to_string()),
                image_url: Some(format!("https://img.example.com/{id}.jpg")),
                is_available: true,
                created_at: Some(format!("2024-01-0{}T12:00:00Z", i + 1)),
            },
        )
        .collect()
}

/// In-memory catalog seeded with [`sample_products`].
#[must_use]
pub fn seeded_catalog() -> Arc<SqliteCatalog> {
    let catalog = SqliteCatalog::open_in_memory().expect("open in-memory catalog");
    catalog
        .upsert_products(&sample_products())
        .expect("seed catalog");
    Arc::new(catalog)
}

/// Test fixture providing an isolated data root.
pub struct CatalogFixture {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl Default for CatalogFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogFixture {
    #[must_use]
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        println!("[FIXTURE] Created temp directory: {root:?}");
        Self { temp_dir, root }
    }

    /// Write a file under the fixture root.
    #[must_use]
    pub fn create_file(&self, relative_path: &str, content: &str) -> PathBuf {
        let full_path = self.root.join(relative_path);
        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        std::fs::write(&full_path, content).expect("Failed to write file");
        full_path
    }

    /// Write the sample products as a JSON import file.
    #[must_use]
    pub fn products_json(&self) -> PathBuf {
        let json = serde_json::to_string_pretty(&sample_products()).expect("serialize products");
        self.create_file("products.json", &json)
    }

    /// Open a file-backed catalog under the fixture root.
    #[must_use]
    pub fn open_catalog(&self) -> SqliteCatalog {
        SqliteCatalog::open(self.root.join("catalog.db")).expect("open catalog")
    }
}
