//! Call-scoped pagination passthrough.
//!
//! Request construction mirrors the pagination window here (step 6 of
//! the orchestration sequence) so the response-pagination collaborator
//! can compute page-relative results after the backend reply arrives,
//! without re-deriving the window. The storage is thread-local, read
//! once and cleared on read, and additionally cleared at the start of
//! every construction so a stale window can never leak into an
//! unrelated later call on a reused thread.
//!
//! Thread-local scoping only covers the synchronous construction path.
//! `Mapper::search` awaits the transport between construction and the
//! reply, and the task may resume on a different thread, so it drains
//! the window before the await and re-seeds it on the resuming thread;
//! the window is scoped to the call, not to whichever worker thread
//! first polled it.

use std::cell::Cell;

use crate::domain::Pageable;

thread_local! {
    static PAGEABLE: Cell<Option<Pageable>> = const { Cell::new(None) };
}

pub(crate) fn set_pageable(pageable: Pageable) {
    PAGEABLE.with(|cell| cell.set(Some(pageable)));
}

pub(crate) fn clear() {
    PAGEABLE.with(|cell| cell.set(None));
}

/// Takes the pagination window recorded by the most recent request
/// construction on this thread. A second read without an intervening
/// paginated request returns `None`.
pub fn get_and_clear_pageable() -> Option<Pageable> {
    PAGEABLE.with(|cell| cell.take())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_once_semantics() {
        set_pageable(Pageable::new(20, 10));
        assert_eq!(get_and_clear_pageable(), Some(Pageable::new(20, 10)));
        assert_eq!(get_and_clear_pageable(), None);
    }

    #[test]
    fn windows_do_not_cross_threads() {
        set_pageable(Pageable::new(5, 5));
        std::thread::spawn(|| {
            assert_eq!(get_and_clear_pageable(), None);
        })
        .join()
        .unwrap();
        assert_eq!(get_and_clear_pageable(), Some(Pageable::new(5, 5)));
    }
}
