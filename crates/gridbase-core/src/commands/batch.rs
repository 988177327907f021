//! Batch sizing against the storage engine's bound-parameter limit.

/// Smallest batch worth issuing.
pub const MIN_BATCH_SIZE: usize = 100;
/// Largest batch a single statement may carry.
pub const MAX_BATCH_SIZE: usize = 500;
/// Bound-parameter budget per statement (Postgres caps at 65535).
pub const MAX_BOUND_PARAMS: usize = 60_000;

/// Records per batch for a row of `field_count` bound parameters:
/// `clamp(100, 500, 60000 / field_count)`.
pub fn calculate_batch_size(field_count: usize) -> usize {
    if field_count == 0 {
        return MAX_BATCH_SIZE;
    }
    (MAX_BOUND_PARAMS / field_count).clamp(MIN_BATCH_SIZE, MAX_BATCH_SIZE)
}

/// Same, further limited by a caller-supplied override.
pub fn calculate_batch_size_with_limit(field_count: usize, limit: Option<usize>) -> usize {
    let computed = calculate_batch_size(field_count);
    match limit {
        Some(limit) => computed.min(limit),
        None => computed,
    }
}

/// Splits items into consecutive chunks of at most `batch_size`.
pub fn into_batches<T>(items: Vec<T>, batch_size: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let size = batch_size.max(1);
    let mut batches = Vec::with_capacity(items.len().div_ceil(size));
    let mut batch = Vec::with_capacity(size.min(items.len()));
    for item in items {
        batch.push(item);
        if batch.len() == size {
            batches.push(std::mem::take(&mut batch));
        }
    }
    if !batch.is_empty() {
        batches.push(batch);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_size_fixed_points() {
        assert_eq!(calculate_batch_size(10), 500);
        assert_eq!(calculate_batch_size(200), 300);
        assert_eq!(calculate_batch_size(1000), 100);
    }

    #[test]
    fn test_batch_size_caller_limit() {
        assert_eq!(calculate_batch_size_with_limit(10, Some(250)), 250);
        assert_eq!(calculate_batch_size_with_limit(10, None), 500);
        // A limit above the computed size never raises it.
        assert_eq!(calculate_batch_size_with_limit(1000, Some(250)), 100);
    }

    #[test]
    fn test_batch_size_zero_fields() {
        assert_eq!(calculate_batch_size(0), MAX_BATCH_SIZE);
    }

    #[test]
    fn test_into_batches_chunking() {
        let batches = into_batches((0..7).collect::<Vec<_>>(), 3);
        assert_eq!(batches, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
        assert!(into_batches(Vec::<i32>::new(), 3).is_empty());
    }
}
