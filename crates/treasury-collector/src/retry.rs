//! 재시도 실행기.
//!
//! 일시적 I/O 에러만 고정 간격으로 재시도합니다. 설정 에러는
//! 치명적이므로 즉시 중단하고, 그 외 에러는 재시도 없이 소진
//! 처리합니다. 결과는 예외가 아닌 값으로 돌려줍니다.

use std::future::Future;
use std::time::Duration;
use treasury_core::{TreasuryError, TreasuryResult};

/// 재시도 정책.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 최대 시도 횟수 (첫 시도 포함)
    pub max_attempts: u32,
    /// 시도 간 고정 대기 시간
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// 재시도 실행 결과.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// 성공
    Success(T),
    /// 모든 시도 소진
    Exhausted {
        attempts: u32,
        last_error: TreasuryError,
    },
    /// 치명적 에러로 즉시 중단
    Aborted(TreasuryError),
}

impl<T> RetryOutcome<T> {
    /// 결과를 `Result`로 변환.
    pub fn into_result(self) -> TreasuryResult<T> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Exhausted { last_error, .. } => Err(last_error),
            Self::Aborted(err) => Err(err),
        }
    }
}

impl RetryPolicy {
    /// 새 정책 생성.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// 연산을 정책에 따라 실행.
    pub async fn run<T, F, Fut>(&self, op_name: &str, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = TreasuryResult<T>>,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            match op().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(op = op_name, attempt, "재시도 후 성공");
                    }
                    return RetryOutcome::Success(value);
                }
                Err(err) if err.is_fatal() => {
                    tracing::error!(op = op_name, error = %err, "치명적 에러, 재시도 중단");
                    return RetryOutcome::Aborted(err);
                }
                Err(err) if !err.is_retryable() => {
                    tracing::warn!(op = op_name, attempt, error = %err, "재시도 불가 에러");
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: err,
                    };
                }
                Err(err) if attempt >= self.max_attempts => {
                    tracing::error!(
                        op = op_name,
                        attempts = attempt,
                        error = %err,
                        "재시도 횟수 소진"
                    );
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last_error: err,
                    };
                }
                Err(err) => {
                    tracing::warn!(
                        op = op_name,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "일시적 에러, 재시도 예정"
                    );
                    tokio::time::sleep(self.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_succeeds_after_two_transient_failures() {
        let calls = AtomicU32::new(0);

        let outcome = fast_policy()
            .run("op", || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(TreasuryError::TransientIo("timeout".to_string()))
                } else {
                    Ok(n)
                }
            })
            .await;

        match outcome {
            RetryOutcome::Success(n) => assert_eq!(n, 3),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_after_max_attempts() {
        let calls = AtomicU32::new(0);

        let outcome = fast_policy()
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TreasuryError::TransientIo("down".to_string()))
            })
            .await;

        match outcome {
            RetryOutcome::Exhausted {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 3);
                assert!(last_error.is_retryable());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_without_retry() {
        let calls = AtomicU32::new(0);

        let outcome = fast_policy()
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TreasuryError::Config("missing key".to_string()))
            })
            .await;

        assert!(matches!(outcome, RetryOutcome::Aborted(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_retryable_error_fails_fast() {
        let calls = AtomicU32::new(0);

        let outcome = fast_policy()
            .run("op", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(TreasuryError::Validation("out of bounds".to_string()))
            })
            .await;

        match outcome {
            RetryOutcome::Exhausted { attempts, .. } => assert_eq!(attempts, 1),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_into_result() {
        assert_eq!(RetryOutcome::Success(7).into_result().unwrap(), 7);
        assert!(RetryOutcome::<()>::Aborted(TreasuryError::Config("x".to_string()))
            .into_result()
            .is_err());
    }
}
