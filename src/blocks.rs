use crate::{
    error::{AniError, Result},
    types::{BlockPair, Pairing},
};

/// Splits `items` into consecutive blocks of at most `capacity` items, keeping order.
pub fn partition<T>(items: &[T], capacity: usize) -> Result<Vec<&[T]>> {
    if capacity == 0 {
        return Err(AniError::InvalidConfig(
            "block size must be a positive integer".to_string(),
        ));
    }
    Ok(items.chunks(capacity).collect())
}

/// Block pairs in row-major order of (query, reference).
pub fn block_pairs(n_blocks: usize, pairing: Pairing) -> Vec<BlockPair> {
    (0..n_blocks)
        .flat_map(|i| (0..n_blocks).map(move |j| BlockPair::new(i, j)))
        .filter(|pair| match pairing {
            Pairing::Full => true,
            Pairing::Triangular => pair.query <= pair.reference,
        })
        .collect()
}
