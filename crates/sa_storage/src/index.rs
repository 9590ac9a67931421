use sa_core::{Error, Result};

/// Exact nearest-neighbour index over L2 distance.
///
/// Runs hold a few dozen vectors at most, so every search is a full scan.
#[derive(Debug, Clone, Default)]
pub struct FlatL2Index {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the matched vector
    pub position: usize,
    /// Squared L2 distance to the query
    pub distance: f32,
}

impl FlatL2Index {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Build an index whose dimension is taken from the first vector.
    pub fn from_vectors(vectors: Vec<Vec<f32>>) -> Result<Self> {
        let dimension = vectors.first().map(Vec::len).unwrap_or_default();
        let mut index = Self::new(dimension);
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector and return its position.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize> {
        if vector.is_empty() {
            return Err(Error::Index("cannot index an empty vector".to_string()));
        }
        if vector.len() != self.dimension {
            return Err(Error::Index(format!(
                "vector has dimension {}, index expects {}",
                vector.len(),
                self.dimension
            )));
        }
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    /// The `k` nearest vectors, nearest first. `k` is clamped to the index size.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        if self.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(Error::Index(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimension
            )));
        }

        let mut neighbors: Vec<Neighbor> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(position, vector)| Neighbor {
                position,
                distance: squared_l2(query, vector),
            })
            .collect();

        // ties keep insertion order so results are deterministic
        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.position.cmp(&b.position))
        });
        neighbors.truncate(k.min(self.vectors.len()));
        Ok(neighbors)
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> FlatL2Index {
        FlatL2Index::from_vectors(vec![
            vec![0.0, 0.0],
            vec![5.0, 5.0],
            vec![1.0, 0.0],
            vec![0.0, 3.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_search_returns_nearest_first() {
        let neighbors = index().search(&[0.1, 0.0], 3).unwrap();
        let positions: Vec<usize> = neighbors.iter().map(|n| n.position).collect();
        assert_eq!(positions, vec![0, 2, 3]);
        assert!(neighbors.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_clamps_k_to_index_size() {
        let neighbors = index().search(&[0.0, 0.0], 10).unwrap();
        assert_eq!(neighbors.len(), 4);
        assert!(index().search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = FlatL2Index::from_vectors(vec![vec![1.0], vec![-1.0], vec![1.0]]).unwrap();
        let positions: Vec<usize> = index
            .search(&[0.0], 3)
            .unwrap()
            .iter()
            .map(|n| n.position)
            .collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let mut index = index();
        assert!(index.add(vec![1.0, 2.0, 3.0]).is_err());
        assert!(index.add(Vec::new()).is_err());
        assert!(index.search(&[1.0], 1).is_err());
        assert!(FlatL2Index::from_vectors(vec![vec![1.0, 2.0], vec![1.0]]).is_err());
    }

    #[test]
    fn test_empty_index_searches_to_nothing() {
        let index = FlatL2Index::from_vectors(Vec::new()).unwrap();
        assert!(index.is_empty());
        assert!(index.search(&[1.0, 2.0], 5).unwrap().is_empty());
    }
}
