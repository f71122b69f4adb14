//! Deferred application of committed optimistic work.

use crate::occ::query::Query;
use crate::types::DataItem;
use ccreplay_storage::{StorageResult, ValueStore};
use std::collections::HashMap;
use tracing::trace;

/// Local copies of item values owned by one committing transaction.
///
/// Items that were never loaded hold `0`.
#[derive(Debug, Default)]
pub(crate) struct Workspace {
    values: HashMap<DataItem, u64>,
}

impl Workspace {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn value(&self, item: &DataItem) -> u64 {
        self.values.get(item).copied().unwrap_or(0)
    }

    fn values(&self, items: &[DataItem]) -> Vec<u64> {
        items.iter().map(|item| self.value(item)).collect()
    }

    /// Applies `queries` in order against `store`.
    ///
    /// Returns the rendering of every `Display`, in order.
    pub(crate) fn apply(
        &mut self,
        queries: &[Query],
        store: &mut dyn ValueStore,
    ) -> StorageResult<Vec<String>> {
        let mut rendered = Vec::new();
        for query in queries {
            match query {
                Query::Read(item) => {
                    let value = store.read(item.as_str())?;
                    trace!(%item, value, "loaded");
                    self.values.insert(item.clone(), value);
                }
                Query::Write(item) => {
                    let value = self.value(item);
                    trace!(%item, value, "stored");
                    store.write(item.as_str(), value)?;
                }
                Query::Function { items, function } => {
                    if let Some(target) = items.first() {
                        let result = function(&self.values(items));
                        self.values.insert(target.clone(), result);
                    }
                }
                Query::Display { items, render } => {
                    rendered.push(render(&self.values(items)));
                }
            }
        }
        store.flush()?;
        Ok(rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccreplay_storage::InMemoryStore;

    #[test]
    fn increment_round_trips_through_store() {
        let mut store = InMemoryStore::with_values([("A", 41)]);
        let queries = vec![
            Query::read("A"),
            Query::function(["A"], |v| v[0] + 1),
            Query::write("A"),
            Query::display(["A"]),
        ];
        let rendered = Workspace::new().apply(&queries, &mut store).unwrap();
        assert_eq!(store.read("A").unwrap(), 42);
        assert_eq!(rendered, ["42"]);
    }

    #[test]
    fn unread_items_default_to_zero() {
        let mut store = InMemoryStore::with_values([("B", 7)]);
        let queries = vec![Query::write("B"), Query::display(["B", "C"])];
        let rendered = Workspace::new().apply(&queries, &mut store).unwrap();
        assert_eq!(store.read("B").unwrap(), 0);
        assert_eq!(rendered, ["0 0"]);
    }

    #[test]
    fn function_combines_into_first_item() {
        let mut store = InMemoryStore::with_values([("A", 2), ("B", 5)]);
        let queries = vec![
            Query::read("A"),
            Query::read("B"),
            Query::function(["A", "B"], |v| v[0] * v[1]),
            Query::write("A"),
            Query::write("B"),
        ];
        Workspace::new().apply(&queries, &mut store).unwrap();
        assert_eq!(store.read("A").unwrap(), 10);
        assert_eq!(store.read("B").unwrap(), 5);
    }
}
