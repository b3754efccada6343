//! In-memory record table for tests and dry runs

use super::{RecordTable, SortQuery};
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
pub struct MemoryTable {
    partitions: RwLock<BTreeMap<String, BTreeMap<String, String>>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across all partitions
    pub fn len(&self) -> usize {
        self.partitions.read().values().map(|p| p.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl RecordTable for MemoryTable {
    async fn put(&self, pk: &str, sk: &str, payload: &str) -> Result<()> {
        self.partitions
            .write()
            .entry(pk.to_string())
            .or_default()
            .insert(sk.to_string(), payload.to_string());
        Ok(())
    }

    async fn get(&self, pk: &str, sk: &str) -> Result<Option<String>> {
        Ok(self.partitions.read().get(pk).and_then(|p| p.get(sk).cloned()))
    }

    async fn query(&self, pk: &str, query: &SortQuery) -> Result<Vec<String>> {
        let partitions = self.partitions.read();
        let Some(partition) = partitions.get(pk) else {
            return Ok(Vec::new());
        };

        let in_range = |sk: &String| {
            query.from.as_ref().map_or(true, |from| sk >= from)
                && query.to.as_ref().map_or(true, |to| sk <= to)
        };
        let limit = query.limit.unwrap_or(usize::MAX);

        let rows: Vec<String> = if query.descending {
            partition
                .iter()
                .rev()
                .filter(|(sk, _)| in_range(sk))
                .take(limit)
                .map(|(_, payload)| payload.clone())
                .collect()
        } else {
            partition
                .iter()
                .filter(|(sk, _)| in_range(sk))
                .take(limit)
                .map(|(_, payload)| payload.clone())
                .collect()
        };
        Ok(rows)
    }

    async fn replace_partition(&self, pk: &str, rows: &[(String, String)]) -> Result<()> {
        let partition: BTreeMap<String, String> = rows.iter().cloned().collect();
        let mut partitions = self.partitions.write();
        if partition.is_empty() {
            partitions.remove(pk);
        } else {
            partitions.insert(pk.to_string(), partition);
        }
        Ok(())
    }
}
