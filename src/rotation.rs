use std::future::Future;

use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::ProviderError;

/// Try a shuffled subset of candidate endpoints until one call succeeds.
///
/// Community-run mirrors are individually unreliable; shuffling spreads
/// load across them and retrying tolerates the ones that are down or
/// rate-limited. A candidate erroring is skipped, not fatal: only
/// exhausting `max_attempts` candidates fails the whole call, with the
/// last error observed.
pub async fn first_success<T, F, Fut>(
    candidates: &[String],
    max_attempts: usize,
    mut call: F,
) -> Result<T, ProviderError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut shuffled = candidates.to_vec();
    {
        let mut rng = rand::thread_rng();
        shuffled.shuffle(&mut rng);
    }

    let mut last_err = None;
    for candidate in shuffled.into_iter().take(max_attempts) {
        match call(candidate.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(candidate = %candidate, error = %e, "candidate failed, trying next");
                last_err = Some(e);
            }
        }
    }

    Err(last_err.unwrap_or(ProviderError::Empty))
}
