//! Learned pattern rows

use rusqlite::params;
use tracing::debug;

use super::{format_timestamp, timestamp_column, Database};
use crate::error::Result;
use crate::models::{ClassificationPattern, PatternKey};
use crate::store::PatternPersistence;

impl Database {
    /// Pattern count per category, largest first
    pub fn pattern_counts_by_category(&self) -> Result<Vec<(i64, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT category_id, COUNT(*) AS n
            FROM classification_patterns
            GROUP BY category_id
            ORDER BY n DESC, category_id
            "#,
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(counts)
    }
}

impl PatternPersistence for Database {
    fn load_patterns(&self) -> Result<Vec<ClassificationPattern>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT pattern_text, category_id, confidence, frequency, last_updated
            FROM classification_patterns
            ORDER BY pattern_text, category_id
            "#,
        )?;

        let patterns = stmt
            .query_map([], |row| {
                Ok(ClassificationPattern {
                    pattern_text: row.get(0)?,
                    category_id: row.get(1)?,
                    confidence: row.get(2)?,
                    frequency: row.get(3)?,
                    last_updated: timestamp_column(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Loaded {} patterns", patterns.len());
        Ok(patterns)
    }

    fn upsert_pattern(&self, pattern: &ClassificationPattern) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO classification_patterns
                (pattern_text, category_id, confidence, frequency, last_updated)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(pattern_text, category_id) DO UPDATE SET
                confidence = excluded.confidence,
                frequency = excluded.frequency,
                last_updated = excluded.last_updated
            "#,
            params![
                pattern.pattern_text,
                pattern.category_id,
                pattern.confidence,
                pattern.frequency,
                format_timestamp(&pattern.last_updated),
            ],
        )?;
        Ok(())
    }

    fn delete_pattern(&self, key: &PatternKey) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "DELETE FROM classification_patterns WHERE pattern_text = ? AND category_id = ?",
            params![key.pattern_text, key.category_id],
        )?;
        Ok(())
    }
}
