//! Editing model for a rule collection.
//!
//! [`RuleBook`] holds a working copy of the records and applies the edits a
//! rule editor offers: add-or-update by source, toggle, remove, search and
//! paging. Persist the result with
//! [`RuleStore::replace_all()`](crate::RuleStore::replace_all).

use thiserror::Error;

use crate::parse::{self, ParseError};
use crate::RuleRecord;

pub const DEFAULT_PAGE_SIZE: usize = 5;

/// Wall-clock time in milliseconds, the unit of record ids and timestamps.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BookError {
    #[error("source and destination must both be non-empty")]
    EmptyInput,

    #[error("no rule with id {id}")]
    UnknownRule { id: i64 },
}

/// Ordered, editable collection of rule records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleBook {
    records: Vec<RuleRecord>,
    last_id: i64,
}

/// A search and page selection over a [`RuleBook`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleQuery {
    pub search: String,
    /// 1-based page number.
    pub page: usize,
    pub page_size: usize,
}

/// One page of records, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RulePage<'a> {
    pub records: Vec<&'a RuleRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

impl Default for RuleQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl RuleQuery {
    #[must_use]
    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    #[must_use]
    pub fn page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }
}

impl RulePage<'_> {
    #[must_use]
    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

impl RuleBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: Vec<RuleRecord>) -> Self {
        let last_id = records.iter().map(|r| r.id).max().unwrap_or(0);
        Self { records, last_id }
    }

    #[must_use]
    pub fn records(&self) -> &[RuleRecord] {
        &self.records
    }

    #[must_use]
    pub fn into_records(self) -> Vec<RuleRecord> {
        self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&RuleRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Add a redirect, or update the existing record with the same source.
    ///
    /// Both inputs are trimmed. An existing record keeps its id, takes the new
    /// destination and timestamp, and is re-enabled. A new record gets an id
    /// derived from `now` (milliseconds) that is never below the last id
    /// handed out plus one.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::EmptyInput`] if either input is blank.
    pub fn submit(&mut self, source: &str, destination: &str, now: i64) -> Result<&RuleRecord, BookError> {
        let source = source.trim();
        let destination = destination.trim();
        if source.is_empty() || destination.is_empty() {
            return Err(BookError::EmptyInput);
        }

        if let Some(index) = self.records.iter().position(|r| r.source_domain == source) {
            let record = &mut self.records[index];
            record.destination_domain = destination.to_owned();
            record.timestamp = now;
            record.enabled = true;
            return Ok(&self.records[index]);
        }

        let id = now.max(self.last_id + 1);
        self.last_id = id;
        self.records
            .push(RuleRecord::new(id, source, destination).with_timestamp(now));
        Ok(&self.records[self.records.len() - 1])
    }

    /// Flip a record between enabled and disabled; returns the new state.
    ///
    /// # Errors
    ///
    /// Returns [`BookError::UnknownRule`] if no record has `id`.
    pub fn toggle(&mut self, id: i64) -> Result<bool, BookError> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(BookError::UnknownRule { id })?;
        record.enabled = !record.enabled;
        Ok(record.enabled)
    }

    /// # Errors
    ///
    /// Returns [`BookError::UnknownRule`] if no record has `id`.
    pub fn remove(&mut self, id: i64) -> Result<RuleRecord, BookError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or(BookError::UnknownRule { id })?;
        Ok(self.records.remove(index))
    }

    /// Submit every entry of a redirect list. Later entries for the same
    /// source replace earlier ones. Returns the number of entries applied.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] if the list does not parse; the book is left
    /// unchanged in that case.
    pub fn import(&mut self, list: &str, now: i64) -> Result<usize, ParseError> {
        let entries = parse::parse(list)?;
        let mut applied = 0;
        for entry in &entries {
            let id = match self.submit(&entry.source, &entry.destination, now) {
                Ok(record) => record.id,
                Err(_) => continue,
            };
            if !entry.enabled {
                if let Some(record) = self.records.iter_mut().find(|r| r.id == id) {
                    record.enabled = false;
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Render the list as a redirect list that [`import()`](Self::import)
    /// reads back. Domains that would not survive as bare tokens are quoted.
    #[must_use]
    pub fn export(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            if !record.enabled {
                out.push_str("! ");
            }
            out.push_str(&parse::list_token(&record.source_domain));
            out.push_str(" -> ");
            out.push_str(&parse::list_token(&record.destination_domain));
            out.push('\n');
        }
        out
    }

    /// Newest-first page of records matching the query's search text
    /// (case-insensitive, on either domain). A page past the end is clamped to
    /// the last page.
    #[must_use]
    pub fn view(&self, query: &RuleQuery) -> RulePage<'_> {
        let needle = query.search.trim().to_lowercase();
        let mut matches: Vec<&RuleRecord> = self
            .records
            .iter()
            .filter(|r| {
                needle.is_empty()
                    || r.source_domain.to_lowercase().contains(&needle)
                    || r.destination_domain.to_lowercase().contains(&needle)
            })
            .collect();
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let page_size = query.page_size.max(1);
        let total_matches = matches.len();
        let total_pages = total_matches.div_ceil(page_size);
        let page = query.page.clamp(1, total_pages.max(1));
        let records = matches
            .into_iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .collect();

        RulePage {
            records,
            page,
            total_pages,
            total_matches,
        }
    }
}
