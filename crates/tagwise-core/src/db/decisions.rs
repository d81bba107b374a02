//! Review decision log

use rusqlite::params;

use super::{timestamp_column, Database};
use crate::error::Result;
use crate::models::{DecisionKind, DecisionRecord, DecisionStats, NewDecisionRecord};
use crate::review::DecisionRecorder;

impl Database {
    /// Append a decision to the log and return its id
    pub fn insert_decision(&self, record: &NewDecisionRecord) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO classification_decisions
                (external_id, description, normalized_text, decision,
                 suggested_category_id, suggested_pattern, suggested_confidence,
                 assigned_category_id)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.external_id,
                record.description,
                record.normalized_text,
                record.kind.as_str(),
                record.suggested_category_id,
                record.suggested_pattern,
                record.suggested_confidence,
                record.assigned_category_id,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent decisions first
    pub fn list_decisions(&self, limit: i64) -> Result<Vec<DecisionRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, external_id, description, normalized_text, decision,
                   suggested_category_id, suggested_pattern, suggested_confidence,
                   assigned_category_id, created_at
            FROM classification_decisions
            ORDER BY id DESC
            LIMIT ?
            "#,
        )?;

        let records = stmt
            .query_map(params![limit], |row| {
                let decision: String = row.get(4)?;
                let kind = decision.parse::<DecisionKind>().map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        4,
                        rusqlite::types::Type::Text,
                        e.into(),
                    )
                })?;
                Ok(DecisionRecord {
                    id: row.get(0)?,
                    external_id: row.get(1)?,
                    description: row.get(2)?,
                    normalized_text: row.get(3)?,
                    kind,
                    suggested_category_id: row.get(5)?,
                    suggested_pattern: row.get(6)?,
                    suggested_confidence: row.get(7)?,
                    assigned_category_id: row.get(8)?,
                    created_at: timestamp_column(row, 9)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    pub fn decision_stats(&self) -> Result<DecisionStats> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT decision, COUNT(*) FROM classification_decisions GROUP BY decision",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut stats = DecisionStats::default();
        for (decision, count) in rows {
            stats.total += count;
            match decision.parse::<DecisionKind>() {
                Ok(DecisionKind::Accept) => stats.accepted += count,
                Ok(DecisionKind::Reject) => stats.rejected += count,
                Ok(DecisionKind::Manual) => stats.manual += count,
                Ok(DecisionKind::InvalidCategory) => stats.invalid_category += count,
                Err(_) => {}
            }
        }
        Ok(stats)
    }
}

impl DecisionRecorder for Database {
    fn record_decision(&self, record: &NewDecisionRecord) -> Result<()> {
        self.insert_decision(record)?;
        Ok(())
    }
}
