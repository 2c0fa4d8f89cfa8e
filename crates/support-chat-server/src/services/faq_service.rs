use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

use crate::services::conversation::{Faq, FaqStore};

/// Read-only queries over the curated FAQ set
#[derive(Clone)]
pub struct FaqService {
    store: Arc<dyn FaqStore>,
}

impl FaqService {
    pub fn new(store: Arc<dyn FaqStore>) -> Self {
        Self { store }
    }

    /// Active entries, optionally limited to an exact category, by (priority, question)
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<Faq>> {
        let category = category.filter(|c| !c.is_empty());
        let faqs = self
            .store
            .list_active_faqs(category.map(str::to_string))
            .await?;

        debug!("Listed {} FAQs (category: {:?})", faqs.len(), category);
        Ok(faqs)
    }

    /// Active entry by id; inactive entries are reported as absent
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Faq>> {
        Ok(self.store.find_faq_by_id(id).await?.filter(|f| f.is_active))
    }

    /// Distinct non-empty categories of active entries, ascending
    pub async fn list_categories(&self) -> Result<Vec<String>> {
        let categories: BTreeSet<String> = self
            .list(None)
            .await?
            .into_iter()
            .filter_map(|f| f.category)
            .filter(|c| !c.is_empty())
            .collect();
        Ok(categories.into_iter().collect())
    }
}
