//! Primary/secondary composition over the retry engine.

use std::future::Future;

use tracing::warn;

use visage_core::UpstreamResult;

use crate::retry::RetryPolicy;

/// A successful result plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome<T> {
    pub result: T,
    pub used_fallback: bool,
}

/// Run `primary` through the retry engine; on exhaustion run `secondary`
/// under the same policy.
///
/// If both paths fail, the *primary* error is propagated — it names the path
/// the caller actually asked for, which is the diagnostically relevant one.
/// The secondary's failure is logged and dropped.
pub async fn execute_with_fallback<T, P, PF, S, SF>(
    policy: &RetryPolicy,
    primary: P,
    secondary: S,
) -> UpstreamResult<FallbackOutcome<T>>
where
    P: FnMut() -> PF,
    PF: Future<Output = UpstreamResult<T>>,
    S: FnMut() -> SF,
    SF: Future<Output = UpstreamResult<T>>,
{
    execute_with_fallback_policies(policy, policy, primary, secondary).await
}

/// As [`execute_with_fallback`], with a distinct policy for the secondary
/// path.
pub async fn execute_with_fallback_policies<T, P, PF, S, SF>(
    primary_policy: &RetryPolicy,
    secondary_policy: &RetryPolicy,
    primary: P,
    secondary: S,
) -> UpstreamResult<FallbackOutcome<T>>
where
    P: FnMut() -> PF,
    PF: Future<Output = UpstreamResult<T>>,
    S: FnMut() -> SF,
    SF: Future<Output = UpstreamResult<T>>,
{
    let primary_err = match primary_policy.execute(primary).await {
        Ok(result) => {
            return Ok(FallbackOutcome {
                result,
                used_fallback: false,
            });
        }
        Err(err) => err,
    };

    warn!(error = %primary_err, "primary path exhausted, invoking fallback");

    match secondary_policy.execute(secondary).await {
        Ok(result) => Ok(FallbackOutcome {
            result,
            used_fallback: true,
        }),
        Err(secondary_err) => {
            warn!(error = %secondary_err, "fallback path also failed, surfacing primary error");
            Err(primary_err)
        }
    }
}
