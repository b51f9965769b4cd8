//! Poll-based handle on one cached, infinitely scrolling list.
//!
//! Where [`crate::query::Query`] owns its result, a `ListQuery` only holds a
//! subscription: the pages live in the shared store, network work runs on
//! spawned tasks, and the view reads a snapshot refreshed on each `poll`.

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::api::{ApiError, CachedClient, ListParams, Resource};
use crate::cache::{DeleteOutcome, FetchOutcome, ItemId, ListState, QueryKey, Subscription};

/// Rows from the end of the list at which the next page is requested.
const PREFETCH_DISTANCE: usize = 3;

/// Message for the user produced by background list work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
  Info(String),
  Error(String),
}

enum ListEvent {
  Fetched {
    key: QueryKey,
    result: Result<FetchOutcome, ApiError>,
  },
  Deleted {
    id: ItemId,
    result: Result<DeleteOutcome, ApiError>,
  },
}

pub struct ListQuery<R: Resource> {
  client: CachedClient,
  params: ListParams<R>,
  subscription: Subscription,
  tx: mpsc::UnboundedSender<ListEvent>,
  rx: mpsc::UnboundedReceiver<ListEvent>,
  items: Vec<R::Item>,
  notices: Vec<Notice>,
}

impl<R: Resource> ListQuery<R> {
  /// Subscribe to the list of `params` and load its first page unless it is
  /// already cached.
  pub fn new(client: CachedClient, params: ListParams<R>) -> Self {
    let subscription = client.subscribe(&params);
    let (tx, rx) = mpsc::unbounded_channel();
    let mut query = Self {
      items: client.items(&params),
      client,
      params,
      subscription,
      tx,
      rx,
      notices: Vec::new(),
    };
    query.fetch_next();
    query
  }

  pub fn params(&self) -> &ListParams<R> {
    &self.params
  }

  pub fn items(&self) -> &[R::Item] {
    &self.items
  }

  pub fn state(&self) -> ListState {
    self.client.state(&self.params)
  }

  pub fn has_next_page(&self) -> bool {
    self.client.has_next_page(&self.params)
  }

  pub fn last_error(&self) -> Option<String> {
    self.client.store().last_error(self.subscription.key())
  }

  /// Request the next page, or the first one when nothing is cached.
  pub fn fetch_next(&mut self) {
    let wanted = match self.state() {
      ListState::Empty => true,
      ListState::Idle => self.has_next_page(),
      ListState::LoadingFirstPage | ListState::LoadingNextPage => false,
    };
    if !wanted {
      return;
    }
    let client = self.client.clone();
    let params = self.params.clone();
    let key = self.subscription.key().clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = client.fetch_next_page(&params).await;
      let _ = tx.send(ListEvent::Fetched { key, result });
    });
  }

  /// Fetch more when `selected` is close to the end of the loaded rows.
  pub fn near_end(&mut self, selected: usize) {
    if selected + PREFETCH_DISTANCE >= self.items.len() {
      self.fetch_next();
    }
  }

  /// Throw the cached pages away and load page 1 again.
  pub fn refresh(&mut self) {
    let client = self.client.clone();
    let params = self.params.clone();
    let key = self.subscription.key().clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = client.refresh(&params).await;
      let _ = tx.send(ListEvent::Fetched { key, result });
    });
  }

  /// Switch to another sort/filter. The new key is subscribed before the old
  /// one is released, so a list shared with another view is not evicted.
  pub fn set_params(&mut self, params: ListParams<R>) {
    if params == self.params {
      return;
    }
    let subscription = self.client.subscribe(&params);
    debug!(from = %self.subscription.key(), to = %subscription.key(), "list params changed");
    self.subscription = subscription;
    self.params = params;
    self.items = self.client.items(&self.params);
    self.fetch_next();
  }

  /// Start deleting `id`. Nothing happens until the returned sender
  /// answers: `true` removes the row and sends the request, `false` or a
  /// dropped sender aborts.
  pub fn begin_delete(&mut self, id: ItemId) -> oneshot::Sender<bool> {
    let (confirm_tx, confirm_rx) = oneshot::channel();
    let client = self.client.clone();
    let params = self.params.clone();
    let tx = self.tx.clone();
    tokio::spawn(async move {
      let result = client
        .delete(&params, &id, || async move { confirm_rx.await.unwrap_or(false) })
        .await;
      let _ = tx.send(ListEvent::Deleted { id, result });
    });
    confirm_tx
  }

  /// Drain finished background work and refresh the snapshot. Returns true
  /// when something finished.
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    while let Ok(event) = self.rx.try_recv() {
      changed = true;
      match event {
        ListEvent::Fetched { key, result } => {
          if &key != self.subscription.key() {
            continue;
          }
          if let Err(e) = result {
            if !matches!(e, ApiError::Cancelled) {
              self.notices.push(Notice::Error(e.to_string()));
            }
          }
        }
        ListEvent::Deleted { id, result } => match result {
          Ok(DeleteOutcome::Deleted) => {
            self
              .notices
              .push(Notice::Info(format!("Deleted {} {}", R::LABEL.to_lowercase(), id)));
          }
          Ok(DeleteOutcome::Declined) => {}
          Err(e) => {
            self
              .notices
              .push(Notice::Error(format!("{}. Press r to refresh", e)));
          }
        },
      }
    }
    self.items = self.client.items(&self.params);
    changed
  }

  pub fn take_notices(&mut self) -> Vec<Notice> {
    std::mem::take(&mut self.notices)
  }
}
