//! Operations of an optimistic transaction.

use crate::types::DataItem;
use std::fmt;
use std::sync::Arc;

/// Combines item values into a new value.
pub type ValueFn = Arc<dyn Fn(&[u64]) -> u64 + Send + Sync>;

/// Renders item values for display.
pub type RenderFn = Arc<dyn Fn(&[u64]) -> String + Send + Sync>;

/// One operation of an optimistic transaction.
///
/// Only `Read` and `Write` take part in validation. `Function` and
/// `Display` work on the transaction's local copies of item values.
#[derive(Clone)]
pub enum Query {
    /// Load an item into the local workspace.
    Read(DataItem),
    /// Store the local value of an item.
    Write(DataItem),
    /// Replace the local value of the first item with `function` of the
    /// local values of all items.
    Function {
        /// Input items; the first one receives the result.
        items: Vec<DataItem>,
        /// The combining function.
        function: ValueFn,
    },
    /// Render the local values of the items.
    Display {
        /// Displayed items.
        items: Vec<DataItem>,
        /// The rendering function.
        render: RenderFn,
    },
}

impl Query {
    /// Creates a read of `item`.
    pub fn read(item: impl Into<DataItem>) -> Self {
        Self::Read(item.into())
    }

    /// Creates a write of `item`.
    pub fn write(item: impl Into<DataItem>) -> Self {
        Self::Write(item.into())
    }

    /// Creates a function over `items`.
    pub fn function<I, F>(items: I, function: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DataItem>,
        F: Fn(&[u64]) -> u64 + Send + Sync + 'static,
    {
        Self::Function {
            items: items.into_iter().map(Into::into).collect(),
            function: Arc::new(function),
        }
    }

    /// Creates a display of `items` rendered with `render`.
    pub fn display_with<I, F>(items: I, render: F) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DataItem>,
        F: Fn(&[u64]) -> String + Send + Sync + 'static,
    {
        Self::Display {
            items: items.into_iter().map(Into::into).collect(),
            render: Arc::new(render),
        }
    }

    /// Creates a display printing the values separated by spaces.
    pub fn display<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<DataItem>,
    {
        Self::display_with(items, |values| {
            values
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(" ")
        })
    }

    /// Returns the items the operation refers to.
    #[must_use]
    pub fn items(&self) -> &[DataItem] {
        match self {
            Self::Read(item) | Self::Write(item) => std::slice::from_ref(item),
            Self::Function { items, .. } | Self::Display { items, .. } => items,
        }
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(item) => f.debug_tuple("Read").field(item).finish(),
            Self::Write(item) => f.debug_tuple("Write").field(item).finish(),
            Self::Function { items, .. } => f.debug_tuple("Function").field(items).finish(),
            Self::Display { items, .. } => f.debug_tuple("Display").field(items).finish(),
        }
    }
}
