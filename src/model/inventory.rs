use super::cursor::{Cursor, Paging};
use super::window_record::WindowRecord;

/// Cells per overlay page.
pub const PAGE_CAPACITY: usize = 16;

/// The windows of one show-cycle, in display order.
#[derive(Debug, Default)]
pub struct Inventory {
    records: Vec<WindowRecord>,
}

impl Inventory {
    pub fn new(records: Vec<WindowRecord>) -> Self { Self { records } }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn records(&self) -> &[WindowRecord] { &self.records }

    pub fn paging(&self) -> Paging { Paging::new(self.records.len(), PAGE_CAPACITY) }

    pub fn page_count(&self) -> usize { self.paging().page_count() }

    pub fn page(&self, page: usize) -> &[WindowRecord] {
        let start = (page * PAGE_CAPACITY).min(self.records.len());
        let end = (start + PAGE_CAPACITY).min(self.records.len());
        &self.records[start..end]
    }

    pub fn get(&self, cursor: Cursor) -> Option<&WindowRecord> {
        if !cursor.is_valid(self.paging()) {
            return None;
        }
        self.records.get(self.paging().flat_index(cursor))
    }
}

impl FromIterator<WindowRecord> for Inventory {
    fn from_iter<I: IntoIterator<Item = WindowRecord>>(iter: I) -> Self {
        Inventory::new(iter.into_iter().collect())
    }
}
