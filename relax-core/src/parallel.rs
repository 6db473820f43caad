//! Fork-join helpers for data-parallel constraint evaluation.
//!
//! Two parallelism axes exist during the calculate phase: across constraints
//! (each reads shared particle state and writes only its own delta buffer)
//! and within one batched constraint (chunks of its delta buffer are
//! disjoint). Both are plain fork-join over rayon's pool; there is no
//! locking anywhere because the apply phase is serialized by the solver.
//!
//! Small workloads fall back to sequential execution: forking has a real
//! cost, and a handful of elements never amortizes it (the same threshold
//! idea as island-count cutoffs in constraint solvers).

use rayon::prelude::*;

/// Workload size below which chunked evaluation stays sequential.
pub const MIN_PARALLEL_LEN: usize = 256;

/// Process disjoint chunks of `data`, possibly in parallel.
///
/// `f` receives the starting index of each chunk and the chunk itself;
/// chunks are contiguous, in order, and of length `chunk_len` (the last may
/// be shorter). With `parallel == false`, or below [`MIN_PARALLEL_LEN`]
/// items, chunks run sequentially on the calling thread - results are
/// identical either way since chunks never alias.
pub fn for_each_chunk_mut<T, F>(data: &mut [T], chunk_len: usize, parallel: bool, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Send + Sync,
{
    let chunk_len = chunk_len.max(1);
    if parallel && data.len() >= MIN_PARALLEL_LEN {
        data.par_chunks_mut(chunk_len)
            .enumerate()
            .for_each(|(i, chunk)| f(i * chunk_len, chunk));
    } else {
        for (i, chunk) in data.chunks_mut(chunk_len).enumerate() {
            f(i * chunk_len, chunk);
        }
    }
}

/// Run one closure per item of `items`, possibly in parallel.
///
/// Used for fan-out over independent per-element workspaces that were split
/// beforehand (e.g. per-element delta slices).
pub fn for_each_task<T, F>(items: Vec<T>, parallel: bool, min_parallel: usize, f: F)
where
    T: Send,
    F: Fn(T) + Send + Sync,
{
    if parallel && items.len() >= min_parallel {
        items.into_par_iter().for_each(f);
    } else {
        for item in items {
            f(item);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_chunks() {
        let mut data: Vec<usize> = vec![0; 10];
        for_each_chunk_mut(&mut data, 4, false, |start, chunk| {
            for (offset, value) in chunk.iter_mut().enumerate() {
                *value = start + offset;
            }
        });
        let expected: Vec<usize> = (0..10).collect();
        assert_eq!(data, expected);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let n = MIN_PARALLEL_LEN * 3 + 17;
        let mut sequential = vec![0usize; n];
        let mut parallel = vec![0usize; n];

        let fill = |start: usize, chunk: &mut [usize]| {
            for (offset, value) in chunk.iter_mut().enumerate() {
                *value = (start + offset) * 7;
            }
        };

        for_each_chunk_mut(&mut sequential, 64, false, fill);
        for_each_chunk_mut(&mut parallel, 64, true, fill);

        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_for_each_task() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let total = AtomicUsize::new(0);
        let items: Vec<usize> = (0..100).collect();

        for_each_task(items, true, 1, |i| {
            total.fetch_add(i, Ordering::Relaxed);
        });
        assert_eq!(total.load(Ordering::Relaxed), 4950);
    }

    #[test]
    fn test_zero_chunk_len_does_not_panic() {
        let mut data = [1, 2, 3];
        for_each_chunk_mut(&mut data, 0, false, |_, chunk| {
            for value in chunk {
                *value += 1;
            }
        });
        assert_eq!(data, [2, 3, 4]);
    }
}
