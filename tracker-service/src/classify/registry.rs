//! Code registry lookup.

use async_trait::async_trait;
use service_core::error::AppError;
use std::collections::HashMap;

/// Read-only lookup of item codes against the labour code registry.
#[async_trait]
pub trait CodeRegistry: Send + Sync {
    /// Resolve codes to their raw categories.
    ///
    /// Only active entries match, exactly and case-sensitively. Codes with
    /// no active entry are absent from the returned map; callers treat them
    /// as unmapped sales items. An empty input yields an empty map without
    /// touching the backing store.
    async fn lookup(&self, codes: &[String]) -> Result<HashMap<String, String>, AppError>;
}

#[derive(Debug, Clone)]
struct StaticEntry {
    category: String,
    is_active: bool,
}

/// In-memory registry for seeded or offline classification.
#[derive(Debug, Clone, Default)]
pub struct StaticCodeRegistry {
    entries: HashMap<String, StaticEntry>,
}

impl StaticCodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active code mapping.
    pub fn with_entry(mut self, code: &str, category: &str) -> Self {
        self.insert(code, category, true);
        self
    }

    /// Add an inactive code mapping (excluded from lookups).
    pub fn with_inactive_entry(mut self, code: &str, category: &str) -> Self {
        self.insert(code, category, false);
        self
    }

    pub fn insert(&mut self, code: &str, category: &str, is_active: bool) {
        self.entries.insert(
            code.to_string(),
            StaticEntry {
                category: category.to_string(),
                is_active,
            },
        );
    }
}

#[async_trait]
impl CodeRegistry for StaticCodeRegistry {
    async fn lookup(&self, codes: &[String]) -> Result<HashMap<String, String>, AppError> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }

        Ok(codes
            .iter()
            .filter_map(|code| {
                self.entries
                    .get(code)
                    .filter(|entry| entry.is_active)
                    .map(|entry| (code.clone(), entry.category.clone()))
            })
            .collect())
    }
}
