/// Header plus rows, in the exact order a sink writes them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Column names. Fixed per job.
    pub header: Vec<String>,
    /// One entry per output row, same arity as `header`.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: AsRef<str>>(header: &[S]) -> Self {
        Self {
            header: header.iter().map(|h| h.as_ref().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.header.len(), "row arity must match header");
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = Vec<String>>) {
        for row in rows {
            self.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header followed by every row, the shape the spreadsheet append call takes.
    pub fn to_values(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}
