use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::crawler::record::PageRecord;
use crate::error::Result;

/// Shape of the persisted checkpoint document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultLayout {
    /// JSON array in visit order
    #[default]
    Array,
    /// JSON object keyed by normalized URL
    Map,
}

/// Accumulated page records of a crawl. Grows monotonically in visit order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    records: Vec<PageRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: PageRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PageRecord] {
        &self.records
    }

    /// Pretty-printed JSON in the requested layout
    pub fn to_json(&self, layout: ResultLayout) -> Result<Vec<u8>> {
        let bytes = match layout {
            ResultLayout::Array => serde_json::to_vec_pretty(&self.records)?,
            ResultLayout::Map => {
                // Keys are unique: the frontier hands out each URL once per run
                let keyed: BTreeMap<&str, &PageRecord> = self
                    .records
                    .iter()
                    .map(|record| (record.url.as_str(), record))
                    .collect();
                serde_json::to_vec_pretty(&keyed)?
            }
        };
        Ok(bytes)
    }

    /// Parse a checkpoint document in either layout
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(bytes)?;
        let records = match value {
            serde_json::Value::Object(_) => {
                let keyed: BTreeMap<String, PageRecord> = serde_json::from_value(value)?;
                keyed.into_values().collect()
            }
            other => serde_json::from_value(other)?,
        };
        Ok(Self { records })
    }
}
