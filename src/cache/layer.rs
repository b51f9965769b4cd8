//! Cache layer that drives paged fetching into the store.

use futures::future::AbortRegistration;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::mutation::{self, DeleteOutcome};
use super::page::Page;
use super::store::{QueryStore, Subscription};
use super::traits::{Entity, FetchError, ItemId};

/// What a call to [`CacheLayer::fetch_next_page`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
  /// A page arrived and was appended
  Appended { page: u32, has_more: bool },
  /// Nothing was requested: a fetch is already in flight or there is no
  /// next page
  Skipped,
  /// The request was cancelled before it finished; nothing was applied
  Cancelled,
}

/// Cache layer that sits between views and the network client.
///
/// It owns no network code: callers hand it a fetcher closure, and the layer
/// decides which page to ask for, gates concurrent fetches per key and
/// applies the result.
pub struct CacheLayer {
  store: Arc<QueryStore>,
}

impl CacheLayer {
  pub fn new(store: Arc<QueryStore>) -> Self {
    Self { store }
  }

  pub fn store(&self) -> &Arc<QueryStore> {
    &self.store
  }

  /// Keep the entry for `key` alive while the returned guard exists.
  pub fn subscribe(&self, key: &QueryKey) -> Subscription {
    self.store.subscribe(key)
  }

  /// Fetch the next page for `key`.
  ///
  /// The fetcher receives the 1-based page number and a cancellation
  /// registration it must honour. A failure leaves the cached pages as they
  /// were and is recorded on the entry.
  pub async fn fetch_next_page<T, F, Fut, E>(
    &self,
    key: &QueryKey,
    fetcher: F,
  ) -> Result<FetchOutcome, E>
  where
    T: Entity,
    F: FnOnce(u32, AbortRegistration) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: FetchError,
  {
    let Some(ticket) = self.store.begin_fetch(key) else {
      return Ok(FetchOutcome::Skipped);
    };
    let page_number = ticket.page;

    match fetcher(page_number, ticket.registration).await {
      Ok(page) => {
        let has_more = page.next_page.is_some();
        if self.store.complete_fetch(key, ticket.ticket, page) {
          Ok(FetchOutcome::Appended {
            page: page_number,
            has_more,
          })
        } else {
          Ok(FetchOutcome::Cancelled)
        }
      }
      Err(e) if e.is_cancelled() => {
        debug!(key = %key, page = page_number, "fetch cancelled");
        Ok(FetchOutcome::Cancelled)
      }
      Err(e) => {
        warn!(key = %key, page = page_number, error = %e, "fetch failed");
        self.store.fail_fetch(key, ticket.ticket, e.to_string());
        Err(e)
      }
    }
  }

  /// Drop cached pages for `key` and fetch page 1 again.
  pub async fn refetch<T, F, Fut, E>(&self, key: &QueryKey, fetcher: F) -> Result<FetchOutcome, E>
  where
    T: Entity,
    F: FnOnce(u32, AbortRegistration) -> Fut,
    Fut: Future<Output = Result<Page<T>, E>>,
    E: FetchError,
  {
    self.store.invalidate(key);
    self.fetch_next_page(key, fetcher).await
  }

  /// Delete an item with an optimistic update of the list under `key`.
  /// See [`mutation::delete_item`].
  pub async fn delete_item<T, C, CFut, D, DFut, E>(
    &self,
    key: &QueryKey,
    item_id: &ItemId,
    confirm: C,
    delete_remote: D,
  ) -> Result<DeleteOutcome, E>
  where
    T: Entity,
    C: FnOnce() -> CFut,
    CFut: Future<Output = bool>,
    D: FnOnce(ItemId) -> DFut,
    DFut: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
  {
    mutation::delete_item::<T, _, _, _, _, _>(&self.store, key, item_id, confirm, delete_remote)
      .await
  }
}

impl Clone for CacheLayer {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
    }
  }
}
