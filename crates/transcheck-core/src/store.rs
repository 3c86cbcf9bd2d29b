//! Caller-owned storage seam for completed analyses.
//!
//! The pipeline itself persists nothing; a caller that wants history keeps
//! a keyed, insertion-ordered list behind this trait. Identifier
//! generation is the caller's business; the trait only requires ids to be
//! stable and unique per stored result.

use crate::model::AnalysisResult;
use crate::{Error, Result};
use std::sync::Mutex;

pub trait AnalysisStore: Send + Sync {
    /// Append a result under `id`. Duplicate ids are rejected.
    fn append(&self, id: &str, result: &AnalysisResult) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<AnalysisResult>>;
    /// Ids in insertion order.
    fn ids(&self) -> Result<Vec<String>>;
}

/// In-memory store for tests and single-process callers. The Mutex gives
/// the single-writer discipline the contract asks of callers.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Vec<(String, AnalysisResult)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalysisStore for MemoryStore {
    fn append(&self, id: &str, result: &AnalysisResult) -> Result<()> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.iter().any(|(k, _)| k == id) {
            return Err(Error::Validation(format!("duplicate analysis id: {id}")));
        }
        inner.push((id.to_string(), result.clone()));
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<AnalysisResult>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.iter().find(|(k, _)| k == id).map(|(_, v)| v.clone()))
    }

    fn ids(&self) -> Result<Vec<String>> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        Ok(inner.iter().map(|(k, _)| k.clone()).collect())
    }
}
