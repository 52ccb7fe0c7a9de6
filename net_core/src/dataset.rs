/// A named column of raw feature or label values.
#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    values: Vec<f64>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A minimal in-memory tabular dataset.
///
/// The trailing column is the label and is excluded from feature
/// iteration. The dataset only provides access to its columns; how the
/// features are interpreted is up to the consumer.
#[derive(Debug, Clone)]
pub struct TabularDataset {
    columns: Vec<Column>,
}

impl TabularDataset {
    /// Creates a dataset from owned columns, the last being the label.
    ///
    /// # Panics
    /// - if fewer than two columns are given (at least one feature plus
    ///   the label)
    /// - if the columns have differing lengths
    pub fn new(columns: Vec<Column>) -> Self {
        assert!(
            columns.len() >= 2,
            "dataset needs at least one feature column and a label column"
        );
        let rows = columns[0].values.len();
        assert!(
            columns.iter().all(|c| c.values.len() == rows),
            "all columns must have the same length"
        );
        Self { columns }
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.columns[0].values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of feature columns (label excluded).
    #[inline]
    pub fn num_features(&self) -> usize {
        self.columns.len() - 1
    }

    /// Feature columns in declaration order; the trailing label column is
    /// skipped.
    pub fn features(&self) -> impl Iterator<Item = &Column> {
        self.columns[..self.columns.len() - 1].iter()
    }

    /// The trailing label column.
    #[inline]
    pub fn label(&self) -> &Column {
        &self.columns[self.columns.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_exclude_trailing_label() {
        let ds = TabularDataset::new(vec![
            Column::new("a", vec![1.0, 2.0]),
            Column::new("b", vec![0.0, 1.0]),
            Column::new("label", vec![0.0, 1.0]),
        ]);
        assert_eq!(ds.num_features(), 2);
        let names: Vec<_> = ds.features().map(|c| c.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(ds.label().name(), "label");
        assert_eq!(ds.len(), 2);
    }

    #[test]
    #[should_panic]
    fn ragged_columns_panic() {
        TabularDataset::new(vec![
            Column::new("a", vec![1.0]),
            Column::new("label", vec![0.0, 1.0]),
        ]);
    }
}
