use std::borrow::Cow;

use crate::error::{Error, Result};

/// A validated column permutation.
///
/// Output position `p` carries original column `source_of(p)`. The same
/// instance drives header width order, bitmap bit order and payload slot
/// order, so an emitted file stays self-consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnOrder {
    sources: Vec<usize>,
    positions: Vec<usize>,
}

impl ColumnOrder {
    #[must_use]
    pub fn identity(column_count: usize) -> Self {
        let sources: Vec<usize> = (0..column_count).collect();
        Self {
            positions: sources.clone(),
            sources,
        }
    }

    /// Builds an order from a 1-based mapping where `mapping[p]` names the
    /// original column placed at output position `p`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidColumnOrder`] if the mapping length differs
    /// from `column_count`, a value falls outside `1..=column_count`, or a
    /// column is named twice.
    pub fn from_one_based(mapping: &[u32], column_count: usize) -> Result<Self> {
        if mapping.len() != column_count {
            return Err(Error::InvalidColumnOrder {
                details: Cow::Owned(format!(
                    "mapping names {} columns but the file has {column_count}",
                    mapping.len()
                )),
            });
        }

        let mut sources = Vec::with_capacity(column_count);
        let mut positions = vec![usize::MAX; column_count];
        for (position, &value) in mapping.iter().enumerate() {
            let source = usize::try_from(value)
                .ok()
                .and_then(|v| v.checked_sub(1))
                .filter(|&v| v < column_count)
                .ok_or_else(|| Error::InvalidColumnOrder {
                    details: Cow::Owned(format!(
                        "column {value} at position {} is outside 1..={column_count}",
                        position + 1
                    )),
                })?;
            if positions[source] != usize::MAX {
                return Err(Error::InvalidColumnOrder {
                    details: Cow::Owned(format!("column {value} appears more than once")),
                });
            }
            positions[source] = position;
            sources.push(source);
        }

        Ok(Self { sources, positions })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Original column index emitted at output `position`.
    #[must_use]
    pub fn source_of(&self, position: usize) -> usize {
        self.sources[position]
    }

    /// Output position of original column `column`.
    #[must_use]
    pub fn position_of(&self, column: usize) -> usize {
        self.positions[column]
    }

    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.sources.iter().enumerate().all(|(idx, &src)| idx == src)
    }

    /// Rearranges `values` (original order) into output order.
    ///
    /// # Panics
    ///
    /// Panics if `values` is shorter than the number of columns.
    #[must_use]
    pub fn apply<T: Clone>(&self, values: &[T]) -> Vec<T> {
        self.sources.iter().map(|&src| values[src].clone()).collect()
    }

    #[must_use]
    pub fn to_one_based(&self) -> Vec<u32> {
        self.sources
            .iter()
            .map(|&src| u32::try_from(src + 1).unwrap_or(u32::MAX))
            .collect()
    }
}
