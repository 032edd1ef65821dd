// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

/// Index of the chunk currently in flight.
///
/// Starts at 0 and only ever moves forward one step, never past `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexCursor {
    idx: usize,
    max: usize,
}

impl IndexCursor {
    /// Cursor over `count` chunks. `None` when there is nothing to index.
    pub fn new(count: usize) -> Option<Self> {
        count.checked_sub(1).map(|max| IndexCursor { idx: 0, max })
    }

    pub fn get(&self) -> usize {
        self.idx
    }

    pub fn max(&self) -> usize {
        self.max
    }

    /// Advances by one and returns the new index, or `None` at the last chunk
    pub fn increase(&mut self) -> Option<usize> {
        if self.idx >= self.max {
            None
        } else {
            self.idx += 1;
            Some(self.idx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_cursor() {
        assert_eq!(IndexCursor::new(0), None);
    }

    #[test]
    fn test_single_chunk() {
        let mut cursor = IndexCursor::new(1).unwrap();
        assert_eq!(cursor.get(), 0);
        assert_eq!(cursor.max(), 0);
        assert_eq!(cursor.increase(), None);
        assert_eq!(cursor.get(), 0);
    }

    #[test]
    fn test_increase_stops_at_max() {
        let mut cursor = IndexCursor::new(3).unwrap();
        assert_eq!(cursor.increase(), Some(1));
        assert_eq!(cursor.get(), 1);
        assert_eq!(cursor.increase(), Some(2));
        assert_eq!(cursor.increase(), None);
        assert_eq!(cursor.increase(), None);
        assert_eq!(cursor.get(), 2);
    }

    #[test]
    fn test_get_does_not_mutate() {
        let cursor = IndexCursor::new(5).unwrap();
        assert_eq!(cursor.get(), 0);
        assert_eq!(cursor.get(), 0);
    }
}
