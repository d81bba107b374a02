//! Category operations

use rusqlite::{params, OptionalExtension};
use tracing::info;

use super::{timestamp_column, Database};
use crate::directory::CategoryDirectory;
use crate::error::{Error, Result};
use crate::models::Category;

/// Default categories created by `seed_default_categories`
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Income", "#22c55e"),
    ("Housing", "#6366f1"),
    ("Utilities", "#8b5cf6"),
    ("Groceries", "#10b981"),
    ("Dining", "#f59e0b"),
    ("Transport", "#ef4444"),
    ("Healthcare", "#ec4899"),
    ("Shopping", "#14b8a6"),
    ("Entertainment", "#f97316"),
    ("Subscriptions", "#a855f7"),
    ("Travel", "#06b6d4"),
    ("Personal", "#84cc16"),
    ("Financial", "#64748b"),
    ("Other", "#9ca3af"),
];

fn row_to_category(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        color: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

impl Database {
    /// Seed the default categories (idempotent - skips existing names)
    ///
    /// Returns the number of categories created.
    pub fn seed_default_categories(&self) -> Result<usize> {
        let conn = self.conn()?;
        let mut created = 0;
        for (name, color) in DEFAULT_CATEGORIES {
            created += conn.execute(
                "INSERT OR IGNORE INTO categories (name, color) VALUES (?, ?)",
                params![name, color],
            )?;
        }
        if created > 0 {
            info!("Seeded {} default categories", created);
        }
        Ok(created)
    }

    /// Create a category and return its id
    pub fn create_category(&self, name: &str, color: Option<&str>) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidData("Category name cannot be empty".into()));
        }
        if self.get_category_by_name(name)?.is_some() {
            return Err(Error::InvalidData(format!(
                "Category '{}' already exists",
                name
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO categories (name, color) VALUES (?, ?)",
            params![name, color],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, color, created_at FROM categories WHERE id = ?",
                params![id],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    /// Look up a category by name (case-insensitive)
    pub fn get_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                "SELECT id, name, color, created_at FROM categories WHERE name = ? COLLATE NOCASE",
                params![name.trim()],
                row_to_category,
            )
            .optional()?;
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT id, name, color, created_at FROM categories ORDER BY name")?;

        let categories = stmt
            .query_map([], row_to_category)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(categories)
    }

    /// Delete a category
    ///
    /// Learned patterns for the category are kept; suggestions pointing at
    /// a missing category are dropped at suggestion time.
    pub fn delete_category(&self, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM categories WHERE id = ?", params![id])?;
        if deleted == 0 {
            return Err(Error::NotFound(format!("Category {}", id)));
        }
        info!("Deleted category {}", id);
        Ok(())
    }

    pub fn category_count(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl CategoryDirectory for Database {
    fn category_exists(&self, category_id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?)",
            params![category_id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}
