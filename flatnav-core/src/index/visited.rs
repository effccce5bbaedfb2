//! Generation-stamped visited set reused across searches on one thread.
//!
//! Clearing bumps a generation counter instead of zeroing the buffer. The
//! buffer is only wiped when the counter wraps.

use std::cell::RefCell;

#[derive(Debug, Default)]
pub(crate) struct VisitedSet {
    marks: Vec<u16>,
    generation: u16,
}

impl VisitedSet {
    /// Starts a new traversal over `len` nodes.
    pub(crate) fn reset(&mut self, len: usize) {
        if self.marks.len() < len {
            self.marks.resize(len, 0);
        }
        if self.generation == u16::MAX {
            self.marks.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
    }

    /// Marks `id`. Returns `true` when it had not been seen this generation.
    #[inline]
    pub(crate) fn insert(&mut self, id: usize) -> bool {
        match self.marks.get_mut(id) {
            Some(mark) if *mark != self.generation => {
                *mark = self.generation;
                true
            }
            _ => false,
        }
    }
}

thread_local! {
    static VISITED: RefCell<VisitedSet> = RefCell::new(VisitedSet::default());
}

/// Runs `f` with this thread's visited set, reset for `len` nodes.
pub(crate) fn with_visited<R>(len: usize, f: impl FnOnce(&mut VisitedSet) -> R) -> R {
    VISITED.with(|cell| {
        let mut visited = cell.borrow_mut();
        visited.reset(len);
        f(&mut visited)
    })
}
