//! Selection state for the switcher grid.
//!
//! Every transition is a pure function from one [`Cursor`] to the next, so the
//! controller only ever swaps whole values.

/// Shape of a paginated list: `total` items split into pages of `per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub total: usize,
    pub per_page: usize,
}

impl Paging {
    pub fn new(total: usize, per_page: usize) -> Self {
        Self { total, per_page: per_page.max(1) }
    }

    pub fn page_count(&self) -> usize { self.total.div_ceil(self.per_page) }

    pub fn page_len(&self, page: usize) -> usize {
        let start = page * self.per_page;
        if start >= self.total { 0 } else { (self.total - start).min(self.per_page) }
    }

    pub fn flat_index(&self, cursor: Cursor) -> usize { cursor.page * self.per_page + cursor.index }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    pub page: usize,
    pub index: usize,
}

impl Cursor {
    pub const fn new(page: usize, index: usize) -> Self { Self { page, index } }

    /// Where a fresh session starts: the window after the current one.
    pub fn initial(paging: Paging) -> Cursor {
        if paging.total > 1 { Cursor::new(0, 1) } else { Cursor::new(0, 0) }
    }

    pub fn is_valid(self, paging: Paging) -> bool {
        self.page < paging.page_count() && self.index < paging.page_len(self.page)
    }

    pub fn next(self, paging: Paging) -> Cursor {
        let pages = paging.page_count();
        if pages == 0 {
            return self;
        }
        if self.index + 1 < paging.page_len(self.page) {
            Cursor::new(self.page, self.index + 1)
        } else {
            Cursor::new((self.page + 1) % pages, 0)
        }
    }

    pub fn previous(self, paging: Paging) -> Cursor {
        let pages = paging.page_count();
        if pages == 0 {
            return self;
        }
        if self.index > 0 {
            Cursor::new(self.page, self.index - 1)
        } else {
            let page = (self.page + pages - 1) % pages;
            Cursor::new(page, paging.page_len(page).saturating_sub(1))
        }
    }

    /// Jumps to `page`; out-of-range pages leave the cursor where it is.
    pub fn go_to_page(self, page: usize, paging: Paging) -> Cursor {
        if page < paging.page_count() { Cursor::new(page, 0) } else { self }
    }

    pub fn next_page(self, paging: Paging) -> Cursor {
        match paging.page_count() {
            0 => self,
            pages => Cursor::new((self.page + 1) % pages, 0),
        }
    }

    pub fn previous_page(self, paging: Paging) -> Cursor {
        match paging.page_count() {
            0 => self,
            pages => Cursor::new((self.page + pages - 1) % pages, 0),
        }
    }

    /// Selects cell `index` of the current page, if it exists.
    pub fn select(self, index: usize, paging: Paging) -> Option<Cursor> {
        (index < paging.page_len(self.page)).then(|| Cursor::new(self.page, index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwitcherState {
    #[default]
    Hidden,
    Showing(Cursor),
}

impl SwitcherState {
    pub fn is_showing(&self) -> bool { matches!(self, SwitcherState::Showing(_)) }

    pub fn cursor(&self) -> Option<Cursor> {
        match *self {
            SwitcherState::Showing(cursor) => Some(cursor),
            SwitcherState::Hidden => None,
        }
    }
}
