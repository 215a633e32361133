//! Data-parallel map over independent work items.
//!
//! Strategies split their input into weakly connected components and map the
//! per-component computation through [`par_map`]. Results come back in input
//! order whichever path runs.

use crate::config::ParallelConfig;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Maps `f` over `items`, in parallel when enabled and worthwhile.
///
/// Runs sequentially when the `parallel` feature is off, when disabled in
/// `config`, or when there are fewer than `config.min_components` items.
pub fn par_map<T, R, F>(items: Vec<T>, f: F, config: &ParallelConfig) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync + Send,
{
    if should_parallelize(items.len(), config) {
        #[cfg(feature = "parallel")]
        {
            return items.into_par_iter().map(f).collect();
        }
    }
    items.into_iter().map(f).collect()
}

/// Maps a fallible `f` over `items` and stops at the first error in input order.
pub fn try_par_map<T, R, E, F>(items: Vec<T>, f: F, config: &ParallelConfig) -> Result<Vec<R>, E>
where
    T: Send,
    R: Send,
    E: Send,
    F: Fn(T) -> Result<R, E> + Sync + Send,
{
    par_map(items, f, config).into_iter().collect()
}

fn should_parallelize(len: usize, config: &ParallelConfig) -> bool {
    cfg!(feature = "parallel") && config.enabled && len > 1 && len >= config.min_components
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Results keep input order on both paths.
    #[test]
    fn preserves_input_order() {
        let items: Vec<u64> = (0..64).collect();
        let expected: Vec<u64> = items.iter().map(|x| x * x).collect();

        let parallel = ParallelConfig::new().with_min_components(2);
        assert_eq!(par_map(items.clone(), |x| x * x, &parallel), expected);
        assert_eq!(par_map(items, |x| x * x, &ParallelConfig::sequential()), expected);
    }

    /// Small batches never go parallel.
    #[test]
    fn threshold_gates_parallelism() {
        let config = ParallelConfig::new().with_min_components(4);
        assert!(!should_parallelize(3, &config));
        assert!(!should_parallelize(1, &ParallelConfig::new().with_min_components(1)));
        assert!(!should_parallelize(10, &ParallelConfig::sequential()));
        assert_eq!(should_parallelize(4, &config), cfg!(feature = "parallel"));
    }

    /// The first error in input order wins.
    #[test]
    fn try_par_map_reports_first_error() {
        let result: Result<Vec<u32>, String> = try_par_map(
            vec![1, 2, 3, 4, 5],
            |x| if x % 2 == 0 { Err(format!("even {x}")) } else { Ok(x) },
            &ParallelConfig::new().with_min_components(1),
        );
        assert_eq!(result, Err("even 2".to_owned()));
    }
}
