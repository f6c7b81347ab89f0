use std::ops::Range;

/// Cursor plus a sliding window of `page_size` visible rows over a list
/// whose length is owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListWindow {
    pub cursor: usize,
    pub window_start: usize,
    pub page_size: usize,
}

impl ListWindow {
    pub fn new(page_size: usize) -> Self {
        Self {
            cursor: 0,
            window_start: 0,
            page_size: page_size.max(1),
        }
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.window_start = 0;
    }

    /// Move by `step` rows, clamped to the list. No-op on an empty list.
    pub fn move_cursor(&mut self, step: isize, len: usize) {
        if len == 0 {
            self.reset();
            return;
        }

        let target = self.cursor as isize + step;
        self.cursor = target.clamp(0, len as isize - 1) as usize;
        self.follow_cursor();
    }

    /// Recompute for a new viewport capacity.
    pub fn resize(&mut self, page_size: usize, len: usize) {
        self.page_size = page_size.max(1);
        if len == 0 {
            self.reset();
            return;
        }
        self.cursor = self.cursor.min(len - 1);
        self.follow_cursor();
    }

    pub fn visible(&self, len: usize) -> Range<usize> {
        let start = self.window_start.min(len);
        let end = (self.window_start + self.page_size).min(len);
        start..end
    }

    fn follow_cursor(&mut self) {
        if self.cursor >= self.window_start + self.page_size {
            self.window_start = self.cursor + 1 - self.page_size;
        }
        if self.cursor < self.window_start {
            self.window_start = self.cursor;
        }
    }
}

impl Default for ListWindow {
    fn default() -> Self {
        Self::new(1)
    }
}

/// How many items of `item_height` rows fit in `rows`.
pub fn page_size_for(rows: u16, item_height: u16) -> usize {
    (rows / item_height.max(1)).max(1) as usize
}
