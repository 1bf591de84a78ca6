use crossbeam_channel::Receiver;
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

use crate::results::MatchRecord;

/// Destination filename → key → most recently aggregated line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregatedTable {
    files: BTreeMap<String, HashMap<String, String>>,
}

impl AggregatedTable {
    /// Inserts or overwrites a value, returning the one it replaced
    #[cfg(test)]
    pub(crate) fn insert(&mut self, record: MatchRecord) -> Option<String> {
        self.files
            .entry(record.filename)
            .or_default()
            .insert(record.key, record.value)
    }

    #[cfg(test)]
    pub(crate) fn get(&self, filename: &str, key: &str) -> Option<&str> {
        self.files
            .get(filename)
            .and_then(|entries| entries.get(key))
            .map(String::as_str)
    }

    /// Per-file entries in filename order
    pub fn files(&self) -> impl Iterator<Item = (&str, &HashMap<String, String>)> {
        self.files
            .iter()
            .map(|(filename, entries)| (filename.as_str(), entries))
    }

    /// Number of destination files with at least one entry
    pub fn len(&self) -> usize {
        self.files.values().filter(|entries| !entries.is_empty()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sole owner of the table while records are being collected
#[derive(Debug, Default)]
pub struct Aggregator {
    table: AggregatedTable,
    records: u64,
    overwritten: u64,
}

/// Table and counters handed over once collection has finished
#[derive(Debug, Default)]
pub struct Aggregation {
    pub table: AggregatedTable,
    pub records: u64,
    /// Records that replaced a different value for the same file and key
    pub overwritten: u64,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one record with last-write-wins semantics
    pub fn accept(&mut self, record: MatchRecord) {
        trace!("Aggregating {} / {}", record.filename, record.key);
        self.records += 1;

        let MatchRecord {
            key,
            value,
            filename,
        } = record;
        match self.table.files.entry(filename).or_default().entry(key) {
            Entry::Occupied(mut slot) => {
                if *slot.get() != value {
                    self.overwritten += 1;
                    debug!(
                        "Key {}: '{}' replaced '{}'",
                        slot.key(),
                        value,
                        slot.get()
                    );
                }
                slot.insert(value);
            }
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
        }
    }

    /// Drains the channel until every sender has been dropped
    pub fn drain(mut self, records: Receiver<MatchRecord>) -> Aggregation {
        for record in records {
            self.accept(record);
        }
        debug!(
            "Aggregated {} records into {} files ({} overwritten)",
            self.records,
            self.table.len(),
            self.overwritten
        );
        self.finish()
    }

    pub fn finish(self) -> Aggregation {
        Aggregation {
            table: self.table,
            records: self.records,
            overwritten: self.overwritten,
        }
    }
}
