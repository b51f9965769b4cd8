//! API client with the list cache in front of it.

use std::future::Future;
use std::sync::Arc;
use tracing::info;

use super::client::ApiClient;
use super::error::ApiError;
use super::resource::{ListParams, Resource};
use super::types::Enrollment;
use crate::scoring::Prediction;
use crate::cache::{
  CacheLayer, DeleteOutcome, FetchOutcome, ItemId, ListState, QueryStore, Subscription,
};

/// Entry point for views and commands: lists go through the cache, writes
/// go to the network and invalidate what they make stale.
#[derive(Clone)]
pub struct CachedClient {
  client: ApiClient,
  cache: CacheLayer,
}

impl CachedClient {
  pub fn new(client: ApiClient, store: Arc<QueryStore>) -> Self {
    Self {
      client,
      cache: CacheLayer::new(store),
    }
  }

  pub fn store(&self) -> &Arc<QueryStore> {
    self.cache.store()
  }

  /// Keep the cached list of `params` alive while the guard is held.
  pub fn subscribe<R: Resource>(&self, params: &ListParams<R>) -> Subscription {
    self.cache.subscribe(&params.key())
  }

  /// Fetch the next page of the list described by `params`, or the first
  /// one if nothing is cached yet.
  pub async fn fetch_next_page<R: Resource>(
    &self,
    params: &ListParams<R>,
  ) -> Result<FetchOutcome, ApiError> {
    let limit = self.client.page_size();
    self
      .cache
      .fetch_next_page(&params.key(), |page, registration| {
        self.client.fetch_page(page, limit, params, registration)
      })
      .await
  }

  /// Drop the cached pages of `params` and load page 1 again.
  pub async fn refresh<R: Resource>(&self, params: &ListParams<R>) -> Result<FetchOutcome, ApiError> {
    let limit = self.client.page_size();
    self
      .cache
      .refetch(&params.key(), |page, registration| {
        self.client.fetch_page(page, limit, params, registration)
      })
      .await
  }

  /// Flattened cached items of `params`.
  pub fn items<R: Resource>(&self, params: &ListParams<R>) -> Vec<R::Item> {
    self.store().items::<R::Item>(&params.key())
  }

  pub fn state<R: Resource>(&self, params: &ListParams<R>) -> ListState {
    self.store().state(&params.key())
  }

  pub fn has_next_page<R: Resource>(&self, params: &ListParams<R>) -> bool {
    self.store().has_next_page(&params.key())
  }

  /// Delete an item shown in the list of `params`, hiding it right away.
  /// The removal is not rolled back when the server refuses.
  pub async fn delete<R, C, CFut>(
    &self,
    params: &ListParams<R>,
    id: &ItemId,
    confirm: C,
  ) -> Result<DeleteOutcome, ApiError>
  where
    R: Resource,
    C: FnOnce() -> CFut,
    CFut: Future<Output = bool>,
  {
    let client = &self.client;
    self
      .cache
      .delete_item::<R::Item, _, _, _, _, _>(&params.key(), id, confirm, |id| async move {
        client.delete::<R>(&id).await
      })
      .await
  }

  /// Fetch one item, bypassing the list cache.
  pub async fn get<R: Resource>(&self, id: &ItemId) -> Result<R::Item, ApiError> {
    self.client.get::<R>(id).await
  }

  /// Copy of the item from any cached list of `R`, shown while the detail
  /// request is in flight.
  pub fn cached_item<R: Resource>(&self, id: &ItemId) -> Option<R::Item> {
    self.store().find_item::<R::Item>(R::NAME, id)
  }

  pub async fn create<R: Resource>(&self, input: &R::Input) -> Result<R::Item, ApiError> {
    let item = self.client.create::<R>(input).await?;
    self.store().invalidate_resource(R::NAME);
    info!(resource = R::NAME, "created");
    Ok(item)
  }

  pub async fn update<R: Resource>(&self, id: &ItemId, input: &R::Input) -> Result<R::Item, ApiError> {
    let item = self.client.update::<R>(id, input).await?;
    self.store().invalidate_resource(R::NAME);
    info!(resource = R::NAME, id = %id, "updated");
    Ok(item)
  }

  pub async fn enroll(&self, student: &ItemId, course: &ItemId) -> Result<Enrollment, ApiError> {
    let enrollment = self.client.enroll(student, course).await?;
    info!(student = %student, course = %course, "enrolled");
    Ok(enrollment)
  }

  /// AI-likelihood score of a text. Nothing is cached.
  pub async fn predict(&self, text: &str) -> Result<Prediction, ApiError> {
    let prediction = self.client.predict(text).await?;
    info!(chars = text.chars().count(), score = prediction.score, "prediction received");
    Ok(prediction)
  }
}
