//! Lazy, bitmask-filtered view over one or more position lists.
//!
//! A view registers components (borrowed bucket lists, or small owned lists)
//! and addresses their entries by cumulative offset in registration order.
//! Filtering clears bits instead of copying, so invalidated entries never shift
//! the ranks consumers see. Views from exact-k lookups and sub-k unions are
//! trivially valid and allocate no bitmask until something is invalidated.

use crate::index::types::Position;
use crate::result::bitmask::Bitmask;
use roaring::RoaringBitmap;
use std::borrow::Cow;

/// Filtered candidate set borrowed from an index's position lists.
#[derive(Debug, Clone)]
pub struct ResultView<'a> {
    components: Vec<Cow<'a, [Position]>>,
    /// Cumulative start offset of each component, plus the total at the end
    starts: Vec<usize>,
    mask: Option<Bitmask>,
    valid: usize,
}

impl Default for ResultView<'_> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a> ResultView<'a> {
    pub fn empty() -> Self {
        Self {
            components: Vec::new(),
            starts: vec![0],
            mask: None,
            valid: 0,
        }
    }

    /// Trivially valid view over borrowed lists. Empty lists are skipped.
    pub fn from_lists<I>(lists: I) -> Self
    where
        I: IntoIterator<Item = &'a [Position]>,
    {
        let mut view = Self::empty();
        for list in lists {
            view.push_list(list);
        }
        view
    }

    /// Single-list view whose validity is given up front.
    ///
    /// # Panics
    /// If `mask.len() != list.len()`.
    pub fn filtered(list: &'a [Position], mask: Bitmask) -> Self {
        assert_eq!(
            mask.len(),
            list.len(),
            "bitmask length must match the position list"
        );
        let mut view = Self::from_lists([list]);
        if !list.is_empty() {
            view.valid = mask.count(true);
            view.mask = Some(mask);
        }
        view
    }

    /// Register a borrowed list as the next component.
    ///
    /// # Panics
    /// If entries have already been invalidated.
    pub fn push_list(&mut self, list: &'a [Position]) {
        self.push(Cow::Borrowed(list));
    }

    /// Register an owned list as the next component.
    ///
    /// # Panics
    /// If entries have already been invalidated.
    pub fn push_owned(&mut self, list: Vec<Position>) {
        self.push(Cow::Owned(list));
    }

    fn push(&mut self, component: Cow<'a, [Position]>) {
        assert!(
            self.mask.is_none(),
            "components must be registered before entries are invalidated"
        );
        if component.is_empty() {
            return;
        }
        let total = self.entry_count() + component.len();
        self.valid += component.len();
        self.components.push(component);
        self.starts.push(total);
    }

    /// Total entries across all components, valid or not
    #[inline]
    pub fn entry_count(&self) -> usize {
        self.starts[self.starts.len() - 1]
    }

    /// Number of entries still marked valid
    #[inline]
    pub fn size(&self) -> usize {
        self.valid
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.valid
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.valid == 0
    }

    /// True while no bitmask has been allocated
    pub fn is_trivially_valid(&self) -> bool {
        self.mask.is_none()
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Registered components in order
    pub fn components(&self) -> impl Iterator<Item = &[Position]> + '_ {
        self.components.iter().map(|c| c.as_ref())
    }

    /// Validity of entry `i`; always true for trivially valid views.
    ///
    /// # Panics
    /// If `i >= entry_count()`.
    pub fn bitmask_at(&self, i: usize) -> bool {
        self.check_entry(i);
        self.mask.as_ref().is_none_or(|m| m.get(i))
    }

    /// Stored position of entry `i`, valid or not.
    ///
    /// # Panics
    /// If `i >= entry_count()`.
    pub fn entry(&self, i: usize) -> Position {
        self.check_entry(i);
        let c = self.starts.partition_point(|&s| s <= i) - 1;
        self.components[c][i - self.starts[c]]
    }

    /// Mark entry `i` invalid. Invalidating twice has no further effect.
    ///
    /// # Panics
    /// If `i >= entry_count()`.
    pub fn invalidate(&mut self, i: usize) {
        self.check_entry(i);
        let total = self.entry_count();
        let mask = self.mask.get_or_insert_with(|| Bitmask::new(total, true));
        if mask.get(i) {
            mask.clear(i);
            self.valid -= 1;
        }
    }

    /// Keep only valid entries whose position satisfies `keep`.
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(Position) -> bool,
    {
        let rejected: Vec<usize> = self
            .valid_entries()
            .filter(|&i| !keep(self.entry(i)))
            .collect();
        for i in rejected {
            self.invalidate(i);
        }
    }

    /// Position of the `rank`-th valid entry.
    ///
    /// # Panics
    /// If `rank >= size()`.
    pub fn at(&self, rank: usize) -> Position {
        match self.get(rank) {
            Some(pos) => pos,
            None => panic!(
                "rank {} out of range for result view of {} valid entries",
                rank, self.valid
            ),
        }
    }

    /// Checked [`at`](Self::at)
    pub fn get(&self, rank: usize) -> Option<Position> {
        if rank >= self.valid {
            return None;
        }
        let i = match &self.mask {
            None => rank,
            Some(mask) => mask.select(rank)?,
        };
        Some(self.entry(i))
    }

    /// Valid positions in entry order
    pub fn iter(&self) -> Iter<'_, 'a> {
        Iter {
            view: self,
            front: 0,
            back: self.entry_count(),
            remaining: self.valid,
        }
    }

    /// Bidirectional cursor parked on the end marker
    pub fn cursor(&self) -> Cursor<'_, 'a> {
        Cursor {
            view: self,
            index: None,
        }
    }

    /// Copy out the valid positions, optionally sorted.
    pub fn to_vector(&self, sort: bool) -> Vec<Position> {
        let mut out: Vec<Position> = self.iter().collect();
        if sort {
            out.sort_unstable();
        }
        out
    }

    /// Valid positions as a roaring bitmap
    pub fn to_bitmap(&self) -> RoaringBitmap {
        self.iter().collect()
    }

    fn valid_entries(&self) -> impl Iterator<Item = usize> + '_ {
        let mut next = 0;
        std::iter::from_fn(move || {
            let i = self.next_valid(next, self.entry_count())?;
            next = i + 1;
            Some(i)
        })
    }

    /// First valid entry in `[from, end)`
    #[inline]
    fn next_valid(&self, from: usize, end: usize) -> Option<usize> {
        match &self.mask {
            None => (from < end).then_some(from),
            Some(mask) => mask.next_set(from).filter(|&i| i < end),
        }
    }

    /// Last valid entry in `[start, before)`
    #[inline]
    fn prev_valid(&self, start: usize, before: usize) -> Option<usize> {
        if before <= start {
            return None;
        }
        match &self.mask {
            None => Some(before - 1),
            Some(mask) => mask.prev_set(before).filter(|&i| i >= start),
        }
    }

    #[inline]
    fn check_entry(&self, i: usize) {
        assert!(
            i < self.entry_count(),
            "entry {} out of range for result view of {} entries",
            i,
            self.entry_count()
        );
    }
}

impl<'v, 'a> IntoIterator for &'v ResultView<'a> {
    type Item = Position;
    type IntoIter = Iter<'v, 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Double-ended iterator over the valid positions of a view
#[derive(Clone)]
pub struct Iter<'v, 'a> {
    view: &'v ResultView<'a>,
    front: usize,
    back: usize,
    remaining: usize,
}

impl Iterator for Iter<'_, '_> {
    type Item = Position;

    fn next(&mut self) -> Option<Position> {
        let i = self.view.next_valid(self.front, self.back)?;
        self.front = i + 1;
        self.remaining -= 1;
        Some(self.view.entry(i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl DoubleEndedIterator for Iter<'_, '_> {
    fn next_back(&mut self) -> Option<Position> {
        let i = self.view.prev_valid(self.front, self.back)?;
        self.back = i;
        self.remaining -= 1;
        Some(self.view.entry(i))
    }
}

impl ExactSizeIterator for Iter<'_, '_> {}

/// Cursor that steps forwards and backwards over valid entries.
///
/// Besides the valid entries there is an end marker sitting between the last
/// and the first entry: moving past either end lands on it, and moving from it
/// wraps to the opposite end.
#[derive(Clone)]
pub struct Cursor<'v, 'a> {
    view: &'v ResultView<'a>,
    index: Option<usize>,
}

impl Cursor<'_, '_> {
    /// Position under the cursor, `None` on the end marker
    pub fn current(&self) -> Option<Position> {
        self.index.map(|i| self.view.entry(i))
    }

    /// Entry index under the cursor
    pub fn entry_index(&self) -> Option<usize> {
        self.index
    }

    pub fn is_end(&self) -> bool {
        self.index.is_none()
    }

    pub fn move_next(&mut self) -> Option<Position> {
        let from = self.index.map_or(0, |i| i + 1);
        self.index = self.view.next_valid(from, self.view.entry_count());
        self.current()
    }

    pub fn move_prev(&mut self) -> Option<Position> {
        let before = self.index.unwrap_or(self.view.entry_count());
        self.index = self.view.prev_valid(0, before);
        self.current()
    }

    /// Return to the end marker
    pub fn reset(&mut self) {
        self.index = None;
    }
}
