use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One training example as unpadded id sequences.
///
/// For translation the target already carries the start and stop
/// ids; for the copy task the target equals the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seq2SeqItem {
    pub source: Vec<usize>,
    pub target: Vec<usize>,
}

impl Seq2SeqItem {
    pub fn new(source: Vec<usize>, target: Vec<usize>) -> Self {
        Self { source, target }
    }
}

pub struct Seq2SeqDataset {
    items: Vec<Seq2SeqItem>,
}

impl Seq2SeqDataset {
    pub fn new(items: Vec<Seq2SeqItem>) -> Self { Self { items } }

    pub fn item_count(&self) -> usize { self.items.len() }
}

impl Dataset<Seq2SeqItem> for Seq2SeqDataset {
    fn get(&self, index: usize) -> Option<Seq2SeqItem> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_indexing() {
        let ds = Seq2SeqDataset::new(vec![
            Seq2SeqItem::new(vec![1, 2], vec![1, 2]),
            Seq2SeqItem::new(vec![3], vec![1, 3, 2]),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).map(|i| i.target), Some(vec![1, 3, 2]));
        assert!(ds.get(2).is_none());
    }
}
