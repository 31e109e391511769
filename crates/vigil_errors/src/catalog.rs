//! Deduplicated error records in most-recently-hit order.

use std::collections::VecDeque;

use vigil_context::{Context, Resolution};

use crate::{ErrorId, ErrorRecord, Tool};

/// Every distinct error seen so far.
///
/// Records live in an arena indexed by [`ErrorId`] and are never removed.
/// A separate recency list gives the scan order: the record hit last is
/// scanned first.
pub struct ErrorCatalog<T: Tool> {
    records: Vec<ErrorRecord<T>>,
    order: VecDeque<ErrorId>,
}

impl<T: Tool> Default for ErrorCatalog<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Tool> ErrorCatalog<T> {
    pub fn new() -> Self {
        ErrorCatalog {
            records: Vec::new(),
            order: VecDeque::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn get(&self, id: ErrorId) -> &ErrorRecord<T> {
        &self.records[id.index()]
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, id: ErrorId) -> &mut ErrorRecord<T> {
        &mut self.records[id.index()]
    }

    /// Find a record equal to (`kind`, `context`, `extra`) and move it to the
    /// head of the scan order.
    pub(crate) fn find_and_promote(
        &mut self,
        tool: &T,
        resolution: Resolution,
        kind: T::Kind,
        context: &Context,
        extra: &T::Extra,
    ) -> Option<ErrorId> {
        let records = &self.records;
        let pos = self.order.iter().position(|&id| {
            let record = &records[id.index()];
            record.kind == kind
                && Context::equal(record.context, context, resolution)
                && tool.eq_extra(resolution, kind, &record.extra, extra)
        })?;
        if pos > 0 {
            if let Some(id) = self.order.remove(pos) {
                self.order.push_front(id);
            }
        }
        self.order.front().copied()
    }

    /// Store a new record at the head of the scan order.
    pub(crate) fn insert(&mut self, record: ErrorRecord<T>) -> ErrorId {
        let id = ErrorId::new(self.records.len());
        self.records.push(record);
        self.order.push_front(id);
        id
    }

    /// The record hit last.
    pub fn most_recent(&self) -> Option<ErrorId> {
        self.order.front().copied()
    }

    /// Records in scan order, most recently hit first.
    pub fn iter(&self) -> impl Iterator<Item = (ErrorId, &ErrorRecord<T>)> + '_ {
        self.order
            .iter()
            .map(|&id| (id, &self.records[id.index()]))
    }

    /// Records in creation order.
    pub fn iter_created(&self) -> impl Iterator<Item = (ErrorId, &ErrorRecord<T>)> + '_ {
        self.records
            .iter()
            .enumerate()
            .map(|(index, record)| (ErrorId::new(index), record))
    }
}
