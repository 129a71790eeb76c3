use crate::CoreError;
use crondeck_platform::PlatformError;
use std::time::Duration;

/// Bounded exponential backoff around the function-create call.
///
/// A freshly created execution role takes a moment to become assumable by
/// the compute platform; the control plane rejects creates in that window
/// with a distinct "role not ready" fault. Only that fault class is
/// retried — every other failure propagates immediately.
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    pub attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 6,
            base: Duration::from_millis(500),
            cap: Duration::from_secs(8),
        }
    }
}

impl Backoff {
    pub fn retry<T>(
        &self,
        what: &str,
        mut op: impl FnMut() -> Result<T, PlatformError>,
    ) -> Result<T, CoreError> {
        let mut delay = self.base;
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_role_not_ready() => {
                    if attempt >= self.attempts {
                        tracing::warn!("{what}: giving up after {attempt} attempts: {e}");
                        return Err(CoreError::RoleSettleTimeout {
                            attempts: self.attempts,
                        });
                    }
                    tracing::debug!(
                        "{what}: role not assumable yet (attempt {attempt}), retrying in {delay:?}"
                    );
                    std::thread::sleep(delay);
                    delay = (delay * 2).min(self.cap);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
