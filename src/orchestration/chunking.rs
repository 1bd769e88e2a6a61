//! Contiguous partitioning of the domain list into worker chunks.

/// Split `items` into contiguous chunks of at most `chunk_size`, preserving
/// order. Only the last chunk may be short. A zero `chunk_size` is treated
/// as one.
pub fn partition<T: Clone>(items: &[T], chunk_size: usize) -> Vec<Vec<T>> {
    items
        .chunks(chunk_size.max(1))
        .map(<[T]>::to_vec)
        .collect()
}
