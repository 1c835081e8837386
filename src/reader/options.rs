/// How `Tail` finds the last rows of a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TailStrategy {
    /// Count every row, rewind, then re-scan and emit the trailing rows.
    /// Needs a seekable stream; memory use is one row.
    #[default]
    TwoPass,
    /// Scan once, keeping the last N encoded rows in memory. Works on
    /// non-seekable input.
    Buffered,
}

/// Configures how rows are re-emitted.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    write_metadata: bool,
    column_order: Vec<u32>,
    tail_strategy: TailStrategy,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanOptions {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            write_metadata: true,
            column_order: Vec::new(),
            tail_strategy: TailStrategy::TwoPass,
        }
    }

    /// Emit the signature and column definitions ahead of the rows.
    #[must_use]
    pub const fn with_metadata(mut self, write_metadata: bool) -> Self {
        self.write_metadata = write_metadata;
        self
    }

    /// Reorders output columns. `order[p]` is the 1-based original column
    /// written at position `p`; an empty list keeps the declared order.
    #[must_use]
    pub fn with_column_order<I>(mut self, order: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.column_order = order.into_iter().collect();
        self
    }

    #[must_use]
    pub const fn with_tail_strategy(mut self, strategy: TailStrategy) -> Self {
        self.tail_strategy = strategy;
        self
    }

    #[must_use]
    pub const fn writes_metadata(&self) -> bool {
        self.write_metadata
    }

    #[must_use]
    pub fn column_order(&self) -> &[u32] {
        &self.column_order
    }

    #[must_use]
    pub const fn tail_strategy(&self) -> TailStrategy {
        self.tail_strategy
    }
}
