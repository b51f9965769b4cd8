//! Pages of list results and the flattened view over them.

use std::collections::HashSet;

use super::traits::{Entity, ItemId};

/// One page of a paginated list.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Page number to request next, absent on the last page
  pub next_page: Option<u32>,
}

impl<T> Page<T> {
  pub fn new(items: Vec<T>, next_page: Option<u32>) -> Self {
    Self { items, next_page }
  }
}

/// Flatten pages into the list a view renders.
///
/// Duplicates by id are dropped, keeping the first occurrence. Page
/// boundaries shift when the server inserts or removes rows between
/// requests, so the same item can show up at the end of one page and the
/// start of the next. Ids compare as in [`ItemId::matches`], so `42` and
/// `"42"` are one item here just as they are for [`without_item`].
pub fn flatten<T: Entity>(pages: &[Page<T>]) -> Vec<T> {
  let mut seen: HashSet<String> = HashSet::new();
  let mut out = Vec::new();
  for page in pages {
    for item in &page.items {
      if seen.insert(item.id().to_string()) {
        out.push(item.clone());
      }
    }
  }
  out
}

/// Copy of `pages` with every item whose id matches `id` removed.
pub fn without_item<T: Entity>(pages: &[Page<T>], id: &ItemId) -> Vec<Page<T>> {
  pages
    .iter()
    .map(|page| Page {
      items: page
        .items
        .iter()
        .filter(|item| !item.id().matches(id))
        .cloned()
        .collect(),
      next_page: page.next_page,
    })
    .collect()
}
