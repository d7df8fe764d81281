use crate::error::{EnsureError, Result};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// The stable state a batch of resources is waited for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalState {
    Ready,
    Deleted,
}

impl TerminalState {
    /// Freshly created resources are never ready right away, so ready polls
    /// pause before the first check.
    fn pause_first(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("ready"),
            Self::Deleted => f.write_str("deleted"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PollConfig {
    /// Pause between checks
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,
    /// Give up after this many checks, zero means never
    #[serde(default)]
    pub max_attempts: u32,
}

fn default_interval() -> Duration {
    Duration::from_secs(5)
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            max_attempts: 0,
        }
    }
}

impl PollConfig {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }
}

/// Poll `probe` for every key until all of them reached `state`.
///
/// Each attempt checks every pending key once. Keys for which `probe`
/// reports `true` are done. After `max_attempts` attempts (if non-zero)
/// the remaining keys are reported in a [`EnsureError::ReconciliationTimeout`].
pub async fn wait_for<F, Fut>(
    kind: &str,
    state: TerminalState,
    keys: &[String],
    poll: &PollConfig,
    mut probe: F,
) -> Result<()>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    if keys.is_empty() {
        return Ok(());
    }

    let mut pending = keys.to_vec();
    let mut attempt = 0u32;

    loop {
        if attempt > 0 || state.pause_first() {
            tokio::time::sleep(poll.interval).await;
        }
        attempt += 1;

        log::debug!(
            "Checking {state} ({attempt}/{}) for {kind}: {pending:?}",
            poll.max_attempts
        );

        let mut still_pending = Vec::with_capacity(pending.len());
        for key in pending {
            if !probe(key.clone()).await? {
                still_pending.push(key);
            }
        }
        pending = still_pending;

        if pending.is_empty() {
            log::debug!("Done waiting for {kind} to become {state}");
            return Ok(());
        }

        if attempt == poll.max_attempts {
            return Err(EnsureError::ReconciliationTimeout {
                kind: kind.to_string(),
                state,
                pending,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn fast(max_attempts: u32) -> PollConfig {
        PollConfig::new(Duration::from_millis(1), max_attempts)
    }

    fn keys(k: &[&str]) -> Vec<String> {
        k.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn done_when_every_key_settles() {
        // key -> checks needed before it reports done
        let remaining = Mutex::new(HashMap::from([("a".to_string(), 1), ("b".to_string(), 3)]));
        let calls = Mutex::new(Vec::new());

        wait_for("domain", TerminalState::Ready, &keys(&["a", "b"]), &fast(0), |key| {
            calls.lock().unwrap().push(key.clone());
            let mut remaining = remaining.lock().unwrap();
            let left = remaining.get_mut(&key).unwrap();
            *left -= 1;
            let done = *left <= 0;
            async move { Ok::<_, EnsureError>(done) }
        })
        .await
        .unwrap();

        // a settles on the first attempt and is not checked again
        assert_eq!(*calls.lock().unwrap(), keys(&["a", "b", "b", "b"]));
    }

    #[tokio::test]
    async fn timeout_reports_pending_keys() {
        let err = wait_for("app", TerminalState::Ready, &keys(&["a", "b"]), &fast(3), |key| {
            let done = key == "a";
            async move { Ok::<_, EnsureError>(done) }
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(err.pending(), ["b".to_string()]);
        assert_eq!(err.to_string(), r#"app ["b"] never became ready"#);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let attempts = Mutex::new(0);
        let result = wait_for("cert", TerminalState::Deleted, &keys(&["x"]), &fast(4), |_| {
            *attempts.lock().unwrap() += 1;
            async { Ok::<_, EnsureError>(false) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(*attempts.lock().unwrap(), 4);
    }

    #[tokio::test]
    async fn probe_errors_propagate() {
        let err = wait_for("app", TerminalState::Deleted, &keys(&["x"]), &fast(0), |_| async {
            Err::<bool, EnsureError>(ClientError::Request("boom".into()).into())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EnsureError::BackingStore(ClientError::Request(_))));
    }

    #[tokio::test]
    async fn nothing_to_wait_for() {
        wait_for("app", TerminalState::Ready, &[], &fast(1), |_| async {
            Err::<bool, _>(EnsureError::NotFound)
        })
        .await
        .unwrap();
    }

    #[test]
    fn poll_config_from_yaml() {
        let poll: PollConfig = serde_yaml::from_str("interval: 250ms\nmaxAttempts: 12\n").unwrap();
        assert_eq!(poll, PollConfig::new(Duration::from_millis(250), 12));

        let poll: PollConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(poll, PollConfig::default());
    }
}
