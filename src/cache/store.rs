//! In-memory store of paged list results.

use futures::future::{AbortHandle, AbortRegistration};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

use super::key::QueryKey;
use super::page::{flatten, Page};
use super::traits::{Entity, ItemId};

/// Where a cached list is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListState {
  /// Nothing cached, nothing in flight
  Empty,
  /// First page requested
  LoadingFirstPage,
  /// Pages cached, no fetch in flight
  Idle,
  /// Pages cached and the next one requested
  LoadingNextPage,
}

/// Permission to fetch one page for a key.
///
/// Only one ticket per key is outstanding at a time. The registration is the
/// cancellation signal for the request; the ticket number lets the store
/// reject results of a fetch that was cancelled or invalidated meanwhile.
pub struct FetchTicket {
  pub ticket: u64,
  pub page: u32,
  pub registration: AbortRegistration,
}

struct InFlight {
  ticket: u64,
  handle: AbortHandle,
}

#[derive(Default)]
struct Entry {
  /// `Vec<Page<T>>` for the entity type of the key's resource
  pages: Option<Box<dyn Any + Send + Sync>>,
  page_count: usize,
  /// Page to request next; `None` once the server reported the last page
  next_param: Option<u32>,
  in_flight: Option<InFlight>,
  subscribers: usize,
  last_error: Option<String>,
}

impl Entry {
  fn new() -> Self {
    Self {
      next_param: Some(1),
      ..Default::default()
    }
  }

  fn pages<T: Entity>(&self) -> &[Page<T>] {
    match &self.pages {
      Some(any) => match any.downcast_ref::<Vec<Page<T>>>() {
        Some(pages) => pages.as_slice(),
        None => {
          error!(entity = T::entity_type(), "cached pages hold a different entity type");
          &[]
        }
      },
      None => &[],
    }
  }

  fn store_pages<T: Entity>(&mut self, pages: Vec<Page<T>>) {
    self.page_count = pages.len();
    self.next_param = match pages.last() {
      Some(last) => last.next_page,
      None => Some(1),
    };
    self.pages = Some(Box::new(pages));
  }

  fn reset(&mut self) {
    self.pages = None;
    self.page_count = 0;
    self.next_param = Some(1);
    self.last_error = None;
    self.abort_in_flight();
  }

  fn abort_in_flight(&mut self) -> bool {
    match self.in_flight.take() {
      Some(in_flight) => {
        in_flight.handle.abort();
        true
      }
      None => false,
    }
  }

  fn state(&self) -> ListState {
    match (self.page_count, self.in_flight.is_some()) {
      (0, false) => ListState::Empty,
      (0, true) => ListState::LoadingFirstPage,
      (_, false) => ListState::Idle,
      (_, true) => ListState::LoadingNextPage,
    }
  }
}

#[derive(Default)]
struct Inner {
  entries: HashMap<QueryKey, Entry>,
  next_ticket: u64,
}

/// Process-wide store of infinite list entries, one per [`QueryKey`].
///
/// Every mutation happens under a single lock, so readers never observe a
/// half-applied write. Entries are evicted as soon as their last
/// [`Subscription`] is dropped; there is no retention window.
#[derive(Default)]
pub struct QueryStore {
  inner: Mutex<Inner>,
}

impl QueryStore {
  pub fn new() -> Self {
    Self::default()
  }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    // Writes are single assignments, so a panic elsewhere cannot leave an
    // entry half-written.
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Register interest in a key. The entry lives while any subscription does.
  pub fn subscribe(self: &Arc<Self>, key: &QueryKey) -> Subscription {
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_insert_with(Entry::new);
    entry.subscribers += 1;
    debug!(key = %key, hash = %key.cache_hash(), subscribers = entry.subscribers, "subscribed");
    Subscription {
      store: Arc::clone(self),
      key: key.clone(),
    }
  }

  fn release(&self, key: &QueryKey) {
    let mut inner = self.lock();
    let evict = match inner.entries.get_mut(key) {
      Some(entry) => {
        entry.subscribers = entry.subscribers.saturating_sub(1);
        entry.subscribers == 0
      }
      None => false,
    };
    if evict {
      if let Some(mut entry) = inner.entries.remove(key) {
        entry.abort_in_flight();
      }
      debug!(key = %key, "evicted");
    }
  }

  /// Cached pages for `key`, empty if nothing is cached.
  pub fn get_pages<T: Entity>(&self, key: &QueryKey) -> Vec<Page<T>> {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .map(|entry| entry.pages::<T>().to_vec())
      .unwrap_or_default()
  }

  /// Flattened, deduplicated items for `key`.
  pub fn items<T: Entity>(&self, key: &QueryKey) -> Vec<T> {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .map(|entry| flatten(entry.pages::<T>()))
      .unwrap_or_default()
  }

  /// Append a page at the end of the entry, creating it if needed.
  /// Fetches go through `complete_fetch`; this seeds entries in tests.
  #[cfg(test)]
  pub fn append_page<T: Entity>(&self, key: &QueryKey, page: Page<T>) {
    let mut inner = self.lock();
    let entry = inner.entries.entry(key.clone()).or_insert_with(Entry::new);
    let mut pages = entry.pages::<T>().to_vec();
    pages.push(page);
    entry.store_pages(pages);
    debug!(key = %key, pages = entry.page_count, "page appended");
  }

  /// Rewrite the cached pages of `key` with `f` and cancel any fetch in
  /// flight for it, as one atomic step.
  ///
  /// Returns false without touching anything when no pages are cached.
  pub fn mutate_pages<T, F>(&self, key: &QueryKey, f: F) -> bool
  where
    T: Entity,
    F: FnOnce(&[Page<T>]) -> Vec<Page<T>>,
  {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return false;
    };
    if entry.page_count == 0 {
      return false;
    }
    let pages = f(entry.pages::<T>());
    entry.store_pages(pages);
    if entry.abort_in_flight() {
      debug!(key = %key, "in-flight fetch cancelled by mutation");
    }
    true
  }

  /// Drop cached pages for `key`; the next read starts again at page 1.
  pub fn invalidate(&self, key: &QueryKey) {
    let mut inner = self.lock();
    if let Some(entry) = inner.entries.get_mut(key) {
      entry.reset();
      debug!(key = %key, "invalidated");
    }
  }

  /// Invalidate every key of a resource, whatever its sort or filter.
  pub fn invalidate_resource(&self, resource: &str) {
    let mut inner = self.lock();
    for (key, entry) in inner.entries.iter_mut() {
      if key.belongs_to(resource) {
        entry.reset();
        debug!(key = %key, "invalidated");
      }
    }
  }

  /// Forget everything, e.g. when the session ends.
  pub fn clear(&self) {
    let mut inner = self.lock();
    for entry in inner.entries.values_mut() {
      entry.abort_in_flight();
    }
    inner.entries.clear();
  }

  pub fn state(&self, key: &QueryKey) -> ListState {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .map(Entry::state)
      .unwrap_or(ListState::Empty)
  }

  /// Whether more pages exist after the cached ones.
  pub fn has_next_page(&self, key: &QueryKey) -> bool {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .is_some_and(|entry| entry.page_count > 0 && entry.next_param.is_some())
  }

  /// Whether a fetch for `key` is outstanding.
  #[cfg(test)]
  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    let inner = self.lock();
    inner
      .entries
      .get(key)
      .is_some_and(|entry| entry.in_flight.is_some())
  }

  /// Message of the last failed fetch, cleared by the next success.
  pub fn last_error(&self, key: &QueryKey) -> Option<String> {
    let inner = self.lock();
    inner.entries.get(key).and_then(|e| e.last_error.clone())
  }

  /// Reserve the next page fetch for `key`.
  ///
  /// Returns `None` while another fetch for the key is in flight, when the
  /// last cached page says there is nothing more, or when nobody subscribes
  /// to the key. An evicted entry is never brought back by a fetch.
  pub fn begin_fetch(&self, key: &QueryKey) -> Option<FetchTicket> {
    let mut inner = self.lock();
    let ticket = inner.next_ticket + 1;
    let Some(entry) = inner.entries.get_mut(key) else {
      debug!(key = %key, "fetch refused, key not subscribed");
      return None;
    };
    if entry.subscribers == 0 || entry.in_flight.is_some() {
      return None;
    }
    let page = entry.next_param?;
    let (handle, registration) = AbortHandle::new_pair();
    entry.in_flight = Some(InFlight { ticket, handle });
    inner.next_ticket = ticket;
    debug!(key = %key, page, ticket, "fetch started");
    Some(FetchTicket {
      ticket,
      page,
      registration,
    })
  }

  /// Apply the result of a fetch. Returns false if the fetch was cancelled,
  /// invalidated or its entry evicted meanwhile; the page is then discarded.
  pub fn complete_fetch<T: Entity>(&self, key: &QueryKey, ticket: u64, page: Page<T>) -> bool {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      debug!(key = %key, ticket, "fetch result for evicted entry discarded");
      return false;
    };
    if !entry.in_flight.as_ref().is_some_and(|f| f.ticket == ticket) {
      debug!(key = %key, ticket, "stale fetch result discarded");
      return false;
    }
    entry.in_flight = None;
    entry.last_error = None;
    let mut pages = entry.pages::<T>().to_vec();
    pages.push(page);
    entry.store_pages(pages);
    debug!(key = %key, pages = entry.page_count, "page appended");
    true
  }

  /// Record a failed fetch, keeping whatever pages are already cached.
  pub fn fail_fetch(&self, key: &QueryKey, ticket: u64, message: impl Into<String>) -> bool {
    let mut inner = self.lock();
    let Some(entry) = inner.entries.get_mut(key) else {
      return false;
    };
    if !entry.in_flight.as_ref().is_some_and(|f| f.ticket == ticket) {
      return false;
    }
    entry.in_flight = None;
    entry.last_error = Some(message.into());
    true
  }

  /// Cancel the fetch in flight for `key`, if any.
  pub fn cancel(&self, key: &QueryKey) -> bool {
    let mut inner = self.lock();
    let cancelled = inner
      .entries
      .get_mut(key)
      .is_some_and(|entry| entry.abort_in_flight());
    if cancelled {
      debug!(key = %key, "fetch cancelled");
    }
    cancelled
  }

  /// First cached copy of an item anywhere under `resource`, used as
  /// placeholder data while a detail fetch is in flight.
  pub fn find_item<T: Entity>(&self, resource: &str, id: &ItemId) -> Option<T> {
    let inner = self.lock();
    inner
      .entries
      .iter()
      .filter(|(key, _)| key.belongs_to(resource))
      .flat_map(|(_, entry)| entry.pages::<T>().iter())
      .flat_map(|page| page.items.iter())
      .find(|item| item.id().matches(id))
      .cloned()
  }

  /// Whether an entry exists for `key`.
  pub fn contains(&self, key: &QueryKey) -> bool {
    self.lock().entries.contains_key(key)
  }
}

/// Keeps a store entry alive. Dropping the last one for a key evicts the
/// entry and cancels its in-flight fetch.
pub struct Subscription {
  store: Arc<QueryStore>,
  key: QueryKey,
}

impl Subscription {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.store.release(&self.key);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::page::tests::{page, Row};

  fn key(resource: &str) -> QueryKey {
    QueryKey::resource_root(resource)
  }

  fn ids(store: &QueryStore, key: &QueryKey) -> Vec<String> {
    store
      .items::<Row>(key)
      .iter()
      .map(|r| r.id.to_string())
      .collect()
  }

  #[test]
  fn test_absent_key_is_empty() {
    let store = QueryStore::new();
    assert!(store.get_pages::<Row>(&key("courses")).is_empty());
    assert_eq!(store.state(&key("courses")), ListState::Empty);
    assert!(!store.has_next_page(&key("courses")));
  }

  #[test]
  fn test_append_preserves_arrival_order() {
    let store = QueryStore::new();
    let k = key("courses");
    store.append_page(&k, page(&["1", "2"], Some(2)));
    store.append_page(&k, page(&["3"], None));
    assert_eq!(store.get_pages::<Row>(&k).len(), 2);
    assert_eq!(ids(&store, &k), vec!["1", "2", "3"]);
    assert!(!store.has_next_page(&k));
  }

  #[test]
  fn test_one_fetch_in_flight_per_key() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    let first = store.begin_fetch(&k).unwrap();
    assert_eq!(first.page, 1);
    assert_eq!(store.state(&k), ListState::LoadingFirstPage);
    assert!(store.begin_fetch(&k).is_none());

    // Other keys are independent
    let _grades = store.subscribe(&key("grades"));
    assert!(store.begin_fetch(&key("grades")).is_some());

    assert!(store.complete_fetch(&k, first.ticket, page(&["1"], Some(2))));
    assert_eq!(store.state(&k), ListState::Idle);

    let second = store.begin_fetch(&k).unwrap();
    assert_eq!(second.page, 2);
    assert_eq!(store.state(&k), ListState::LoadingNextPage);
  }

  #[test]
  fn test_no_fetch_past_last_page() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    store.append_page(&k, page(&["1"], None));
    assert!(store.begin_fetch(&k).is_none());
  }

  #[test]
  fn test_cancelled_fetch_does_not_mutate() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    let ticket = store.begin_fetch(&k).unwrap();
    assert!(store.cancel(&k));
    assert!(!store.complete_fetch(&k, ticket.ticket, page(&["1"], None)));
    assert!(store.get_pages::<Row>(&k).is_empty());
    assert_eq!(store.state(&k), ListState::Empty);
  }

  #[test]
  fn test_invalidate_discards_pages_and_in_flight() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    store.append_page(&k, page(&["1"], Some(2)));
    let ticket = store.begin_fetch(&k).unwrap();
    store.invalidate(&k);
    assert!(!store.complete_fetch(&k, ticket.ticket, page(&["2"], None)));
    assert!(store.get_pages::<Row>(&k).is_empty());
    assert_eq!(store.begin_fetch(&k).unwrap().page, 1);
  }

  #[test]
  fn test_invalidate_resource_only_touches_that_resource() {
    let store = QueryStore::new();
    let courses = key("courses");
    let grades = key("grades");
    store.append_page(&courses, page(&["1"], None));
    store.append_page(&grades, page(&["9"], None));
    store.invalidate_resource("courses");
    assert!(store.get_pages::<Row>(&courses).is_empty());
    assert_eq!(ids(&store, &grades), vec!["9"]);
  }

  #[test]
  fn test_failed_fetch_keeps_stale_pages() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    store.append_page(&k, page(&["1"], Some(2)));
    let ticket = store.begin_fetch(&k).unwrap();
    assert!(store.fail_fetch(&k, ticket.ticket, "boom"));
    assert_eq!(ids(&store, &k), vec!["1"]);
    assert_eq!(store.last_error(&k).as_deref(), Some("boom"));
    assert_eq!(store.state(&k), ListState::Idle);

    // Retry is possible and clears the error
    let retry = store.begin_fetch(&k).unwrap();
    assert_eq!(retry.page, 2);
    store.complete_fetch(&k, retry.ticket, page(&["2"], None));
    assert_eq!(store.last_error(&k), None);
  }

  #[test]
  fn test_mutate_pages_cancels_in_flight() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    store.append_page(&k, page(&["1", "2"], Some(2)));
    let ticket = store.begin_fetch(&k).unwrap();
    let changed = store.mutate_pages::<Row, _>(&k, |pages| {
      crate::cache::page::without_item(pages, &ItemId::from("1"))
    });
    assert!(changed);
    assert_eq!(ids(&store, &k), vec!["2"]);
    assert!(!store.is_fetching(&k));
    assert!(!store.complete_fetch(&k, ticket.ticket, page(&["1", "3"], None)));
    assert_eq!(ids(&store, &k), vec!["2"]);
  }

  #[test]
  fn test_mutate_pages_without_cached_pages_is_noop() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let _sub = store.subscribe(&k);
    let _ticket = store.begin_fetch(&k).unwrap();
    assert!(!store.mutate_pages::<Row, _>(&k, |pages| pages.to_vec()));
    assert!(store.is_fetching(&k));
  }

  #[test]
  fn test_last_subscription_evicts_entry() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let a = store.subscribe(&k);
    let b = store.subscribe(&k);
    store.append_page(&k, page(&["1"], None));

    drop(a);
    assert_eq!(ids(&store, &k), vec!["1"]);

    drop(b);
    assert!(!store.contains(&k));
    assert!(store.get_pages::<Row>(&k).is_empty());
  }

  #[test]
  fn test_eviction_discards_late_result() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let sub = store.subscribe(&k);
    let ticket = store.begin_fetch(&k).unwrap();
    drop(sub);
    assert!(!store.complete_fetch(&k, ticket.ticket, page(&["1"], None)));
    assert!(!store.contains(&k));
  }

  #[test]
  fn test_unsubscribed_key_is_not_fetched() {
    let store = QueryStore::new();
    let k = key("courses");
    assert!(store.begin_fetch(&k).is_none());
    assert!(!store.contains(&k));

    // Seeded pages alone do not keep a key alive for fetching
    store.append_page(&k, page(&["1"], Some(2)));
    assert!(store.begin_fetch(&k).is_none());
  }

  #[test]
  fn test_fetch_after_last_subscription_does_not_recreate_entry() {
    let store = Arc::new(QueryStore::new());
    let k = key("courses");
    let sub = store.subscribe(&k);
    store.append_page(&k, page(&["1"], Some(2)));
    drop(sub);

    assert!(store.begin_fetch(&k).is_none());
    assert!(!store.contains(&k));
    assert_eq!(store.state(&k), ListState::Empty);
  }

  #[test]
  fn test_find_item_across_keys() {
    let store = QueryStore::new();
    let sorted = crate::cache::key::build_key::<_, serde_json::Value>(
      "courses",
      Some(&serde_json::json!({ "orderBy": "id", "order": "ASC" })),
      None,
    );
    store.append_page(&key("courses"), page(&["1"], None));
    store.append_page(&sorted, page(&["2"], None));
    store.append_page(&key("grades"), page(&["3"], None));

    let found: Option<Row> = store.find_item("courses", &ItemId::from("2"));
    assert_eq!(found.map(|r| r.name), Some("row 2".to_string()));
    assert!(store
      .find_item::<Row>("courses", &ItemId::from("3"))
      .is_none());
  }

  #[test]
  fn test_clear() {
    let store = QueryStore::new();
    store.append_page(&key("courses"), page(&["1"], None));
    store.append_page(&key("grades"), page(&["2"], None));
    store.clear();
    assert!(!store.contains(&key("courses")));
    assert!(!store.contains(&key("grades")));
  }
}
