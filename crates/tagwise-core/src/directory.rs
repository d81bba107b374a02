//! Category lookup seam
//!
//! The engine only needs to know whether a category id still exists. The
//! category store itself lives in [`crate::db`].

use std::collections::{BTreeSet, HashSet};

use crate::error::Result;

/// Answers whether a category id refers to a live category
pub trait CategoryDirectory: Send + Sync {
    fn category_exists(&self, category_id: i64) -> Result<bool>;
}

/// Directory that treats every id as valid
#[derive(Debug, Default, Clone, Copy)]
pub struct AnyCategory;

impl CategoryDirectory for AnyCategory {
    fn category_exists(&self, _category_id: i64) -> Result<bool> {
        Ok(true)
    }
}

impl CategoryDirectory for HashSet<i64> {
    fn category_exists(&self, category_id: i64) -> Result<bool> {
        Ok(self.contains(&category_id))
    }
}

impl CategoryDirectory for BTreeSet<i64> {
    fn category_exists(&self, category_id: i64) -> Result<bool> {
        Ok(self.contains(&category_id))
    }
}
