use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use votematch_protocol::BillId;

/// Display metadata for a bill. Never influences matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillMetadata {
    pub bill_id: BillId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub deliberation_completed: bool,
}

impl BillMetadata {
    pub fn new(bill_id: BillId, title: impl Into<String>) -> Self {
        Self {
            bill_id,
            title: title.into(),
            description: None,
            passed: false,
            deliberation_completed: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Human-readable legislative status.
    pub fn status_label(&self) -> &'static str {
        match (self.passed, self.deliberation_completed) {
            (true, _) => "passed",
            (false, false) => "in deliberation",
            (false, true) => "rejected",
        }
    }
}

/// A bill that loads strongly on one latent dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepresentativeBill {
    pub bill_id: BillId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub passed: bool,
    #[serde(default)]
    pub deliberation_completed: bool,
    pub loading: f32,
    pub abs_loading: f32,
}

/// Lookup table of bill display metadata.
#[derive(Debug, Clone, Default)]
pub struct BillCatalog {
    bills: HashMap<BillId, BillMetadata>,
}

impl BillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let bills: Vec<BillMetadata> = serde_json::from_str(raw)?;
        Ok(bills.into_iter().collect())
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        log::info!("Loading bill catalog from {:?}", path.as_ref());
        let data = tokio::fs::read_to_string(&path).await?;
        let catalog = Self::from_json(&data)?;
        log::info!("Loaded metadata for {} bills", catalog.len());
        Ok(catalog)
    }

    pub fn insert(&mut self, bill: BillMetadata) {
        self.bills.insert(bill.bill_id, bill);
    }

    /// Adds bills that are only known through a representative-bill entry.
    /// Existing entries win.
    pub fn fill_from_representatives<'a>(
        &mut self,
        representatives: impl IntoIterator<Item = &'a RepresentativeBill>,
    ) {
        for rep in representatives {
            if rep.title.is_empty() {
                continue;
            }
            self.bills.entry(rep.bill_id).or_insert_with(|| BillMetadata {
                bill_id: rep.bill_id,
                title: rep.title.clone(),
                description: None,
                passed: rep.passed,
                deliberation_completed: rep.deliberation_completed,
            });
        }
    }

    pub fn get(&self, bill_id: BillId) -> Option<&BillMetadata> {
        self.bills.get(&bill_id)
    }

    pub fn len(&self) -> usize {
        self.bills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bills.is_empty()
    }
}

impl FromIterator<BillMetadata> for BillCatalog {
    fn from_iter<I: IntoIterator<Item = BillMetadata>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for bill in iter {
            catalog.insert(bill);
        }
        catalog
    }
}
