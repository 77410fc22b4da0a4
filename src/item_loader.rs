//! Race-safe item resolution.
//!
//! Each request takes a monotonically increasing [`LoadTicket`] and records its
//! item as the pending target before anything asynchronous happens. A result
//! may only be applied while its ticket is still the latest one, so the most
//! recently issued request always wins regardless of completion order.
//!
//! Superseded requests are additionally aborted, which drops the resolver's
//! future instead of letting it run to completion.

use std::cell::{Cell, RefCell};

use futures::future::{AbortHandle, Abortable, FutureExt, LocalBoxFuture};

use crate::collaborators::{MediaResolver, ResolvedMedia};
use crate::error::EngineError;
use crate::index_map::ItemGroup;
use crate::model::{Item, ItemId};

/// Identity of one item request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

/// What a call to `set_item` did to the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The resolved media is now displayed
    Applied,
    /// A later request was issued first; nothing was applied
    Superseded,
    /// The item was already loaded or loading; only the group changed
    Unchanged,
}

/// Result of awaiting a request.
#[derive(Debug)]
pub enum Fetched {
    Media(ResolvedMedia),
    /// The request was aborted by a newer one
    Aborted,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    ticket: LoadTicket,
    item_id: ItemId,
}

/// Item request bookkeeping of one view.
#[derive(Debug, Default)]
pub struct ItemLoader {
    latest: Cell<u64>,
    pending: Cell<Option<Pending>>,
    /// Group the pending request will be shown with; the latest call sets it
    pending_group: RefCell<Option<ItemGroup>>,
    abort: RefCell<Option<AbortHandle>>,
}

impl ItemLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a request for `item`.
    ///
    /// Synchronously makes `item` the pending target, aborts the previous
    /// request and starts exactly one resolver call.
    pub fn request(
        &self,
        resolver: &dyn MediaResolver,
        item: &Item,
        group: Option<&ItemGroup>,
    ) -> (LoadTicket, LocalBoxFuture<'static, Result<Fetched, EngineError>>) {
        let ticket = self.begin(item.id);
        *self.pending_group.borrow_mut() = group.cloned();
        let (handle, registration) = AbortHandle::new_pair();
        *self.abort.borrow_mut() = Some(handle);

        let fetch = Abortable::new(resolver.resolve_item(item, group), registration).map(
            |result| match result {
                Ok(Ok(media)) => Ok(Fetched::Media(media)),
                Ok(Err(e)) => Err(e),
                Err(_aborted) => Ok(Fetched::Aborted),
            },
        );
        (ticket, fetch.boxed_local())
    }

    fn begin(&self, item_id: ItemId) -> LoadTicket {
        self.abort_in_flight();
        let ticket = LoadTicket(self.latest.get() + 1);
        self.latest.set(ticket.0);
        self.pending.set(Some(Pending { ticket, item_id }));
        ticket
    }

    /// Whether `ticket` belongs to the most recently issued request.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.latest.get()
    }

    /// Item of the request that has been issued but not finished.
    pub fn pending_item(&self) -> Option<ItemId> {
        self.pending.get().map(|p| p.item_id)
    }

    /// Group the pending request will be shown with.
    pub fn pending_group(&self) -> Option<ItemGroup> {
        self.pending_group.borrow().clone()
    }

    /// Replace the group of the pending request. Ignored when nothing is pending.
    pub fn set_pending_group(&self, group: Option<ItemGroup>) {
        if self.pending.get().is_some() {
            *self.pending_group.borrow_mut() = group;
        }
    }

    /// Mark the request as settled and return the group it should be shown
    /// with. Ignored (returning `None`) for stale tickets.
    pub fn finish(&self, ticket: LoadTicket) -> Option<ItemGroup> {
        if !self.pending.get().is_some_and(|p| p.ticket == ticket) {
            return None;
        }
        self.pending.set(None);
        self.abort.borrow_mut().take();
        self.pending_group.borrow_mut().take()
    }

    /// Invalidate every outstanding request.
    pub fn cancel(&self) {
        self.abort_in_flight();
        self.latest.set(self.latest.get() + 1);
        self.pending.set(None);
        self.pending_group.borrow_mut().take();
    }

    fn abort_in_flight(&self) {
        if let Some(handle) = self.abort.borrow_mut().take() {
            handle.abort();
        }
    }
}
