//! Optimistic mutations on cached lists.

use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

use super::key::QueryKey;
use super::page::without_item;
use super::store::QueryStore;
use super::traits::{Entity, ItemId};

/// How a delete request ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
  /// The user declined; nothing was touched
  Declined,
  /// The item was removed locally and the server accepted the delete
  Deleted,
}

/// Delete an item with an optimistic cache update.
///
/// 1. `confirm` is awaited; `false` aborts with no side effects.
/// 2. The item is removed from every cached page of `key` and any fetch in
///    flight for `key` is cancelled, in one step, before the request goes out.
/// 3. `delete_remote` is awaited.
///
/// A failed remote delete is returned to the caller but the cache is not
/// rolled back: the item stays hidden until the list is refreshed.
pub async fn delete_item<T, C, CFut, D, DFut, E>(
  store: &QueryStore,
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
  E: Display,
{
  if !confirm().await {
    debug!(key = %key, id = %item_id, "delete declined");
    return Ok(DeleteOutcome::Declined);
  }

  let removed = store.mutate_pages::<T, _>(key, |pages| without_item(pages, item_id));
  debug!(key = %key, id = %item_id, removed, "optimistic delete applied");

  match delete_remote(item_id.clone()).await {
    Ok(()) => Ok(DeleteOutcome::Deleted),
    Err(e) => {
      warn!(
        key = %key,
        id = %item_id,
        error = %e,
        "remote delete failed; item stays hidden until the list is refreshed"
      );
      Err(e)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::page::tests::{page, Row};
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::{Arc, Mutex};

  fn ids(store: &QueryStore, key: &QueryKey) -> Vec<String> {
    store
      .items::<Row>(key)
      .iter()
      .map(|r| r.id.to_string())
      .collect()
  }

  #[tokio::test]
  async fn test_item_hidden_before_remote_resolves() {
    let store = QueryStore::new();
    let key = QueryKey::resource_root("tests");
    store.append_page(&key, page(&["1", "42", "3"], None));

    let seen_during_request = Mutex::new(Vec::new());
    let outcome = delete_item::<Row, _, _, _, _, String>(
      &store,
      &key,
      &ItemId::from("42"),
      || async { true },
      |_id| {
        *seen_during_request.lock().unwrap() = ids(&store, &key);
        async { Ok(()) }
      },
    )
    .await;

    assert_eq!(outcome, Ok(DeleteOutcome::Deleted));
    assert_eq!(*seen_during_request.lock().unwrap(), vec!["1", "3"]);
    assert_eq!(ids(&store, &key), vec!["1", "3"]);
  }

  #[tokio::test]
  async fn test_decline_changes_nothing() {
    let store = QueryStore::new();
    let key = QueryKey::resource_root("tests");
    store.append_page(&key, page(&["1", "42"], Some(2)));
    let before = store.get_pages::<Row>(&key);
    let called = AtomicBool::new(false);

    let outcome = delete_item::<Row, _, _, _, _, String>(
      &store,
      &key,
      &ItemId::from("42"),
      || async { false },
      |_id| {
        called.store(true, Ordering::SeqCst);
        async { Ok(()) }
      },
    )
    .await;

    assert_eq!(outcome, Ok(DeleteOutcome::Declined));
    assert!(!called.load(Ordering::SeqCst));
    assert_eq!(store.get_pages::<Row>(&key), before);
  }

  #[tokio::test]
  async fn test_failed_delete_is_not_rolled_back() {
    let store = QueryStore::new();
    let key = QueryKey::resource_root("tests");
    store.append_page(&key, page(&["1", "42"], None));

    let outcome = delete_item::<Row, _, _, _, _, String>(
      &store,
      &key,
      &ItemId::from("42"),
      || async { true },
      |_id| async { Err("server said no".to_string()) },
    )
    .await;

    assert_eq!(outcome, Err("server said no".to_string()));
    assert_eq!(ids(&store, &key), vec!["1"]);
  }

  #[tokio::test]
  async fn test_in_flight_fetch_cancelled() {
    let store = Arc::new(QueryStore::new());
    let key = QueryKey::resource_root("tests");
    let _sub = store.subscribe(&key);
    store.append_page(&key, page(&["1", "42"], Some(2)));
    let ticket = store.begin_fetch(&key).unwrap();

    delete_item::<Row, _, _, _, _, String>(
      &store,
      &key,
      &ItemId::from("42"),
      || async { true },
      |_id| async { Ok(()) },
    )
    .await
    .unwrap();

    // The stale page still carrying 42 is rejected
    assert!(!store.complete_fetch(&key, ticket.ticket, page(&["42", "5"], None)));
    assert_eq!(ids(&store, &key), vec!["1"]);
  }

  #[tokio::test]
  async fn test_uncached_key_still_deletes_remotely() {
    let store = QueryStore::new();
    let key = QueryKey::resource_root("tests");
    let called = AtomicBool::new(false);

    let outcome = delete_item::<Row, _, _, _, _, String>(
      &store,
      &key,
      &ItemId::from("42"),
      || async { true },
      |id| {
        assert_eq!(id, ItemId::from("42"));
        called.store(true, Ordering::SeqCst);
        async { Ok(()) }
      },
    )
    .await;

    assert_eq!(outcome, Ok(DeleteOutcome::Deleted));
    assert!(called.load(Ordering::SeqCst));
    assert!(store.get_pages::<Row>(&key).is_empty());
  }
}
