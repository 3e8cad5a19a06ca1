//! Blocking poll engine
//!
//! Repeats a request until the task reports completion, the task fails, the
//! server answers 401, or the deadline runs out. Every attempt asks the task
//! for a fresh request, so cursors and signatures are always current.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::error::{TargetError, TargetResult};
use crate::host::{HttpRequest, HttpResponse, TlsIdentity, Transport};
use crate::timeout::{Deadline, PollTimeout};

/// Status that always aborts a poll
pub const UNAUTHORIZED: u16 = 401;

/// Verdict of one evaluated response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Done,
    Pending,
}

/// One polled operation: builds requests and judges responses
///
/// The task owns whatever state its requests depend on (cursors, signing
/// context), so `build_request` can reflect what `evaluate` learned.
pub trait PollTask {
    fn build_request(&mut self) -> TargetResult<HttpRequest>;

    /// Judge a non-401 response. Errors end the poll without retry.
    fn evaluate(&mut self, response: &HttpResponse) -> TargetResult<Progress>;
}

/// Poll task made of two closures
pub struct FnTask<B, E> {
    build: B,
    evaluate: E,
}

/// Create a poll task from a request builder and an evaluator
pub fn poll_fn<B, E>(build: B, evaluate: E) -> FnTask<B, E>
where
    B: FnMut() -> TargetResult<HttpRequest>,
    E: FnMut(&HttpResponse) -> TargetResult<Progress>,
{
    FnTask { build, evaluate }
}

impl<B, E> PollTask for FnTask<B, E>
where
    B: FnMut() -> TargetResult<HttpRequest>,
    E: FnMut(&HttpResponse) -> TargetResult<Progress>,
{
    fn build_request(&mut self) -> TargetResult<HttpRequest> {
        (self.build)()
    }

    fn evaluate(&mut self, response: &HttpResponse) -> TargetResult<Progress> {
        (self.evaluate)(response)
    }
}

/// Result of a poll that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the task reported `Done`. Only a `Once` poll can end
    /// successfully without completing.
    pub completed: bool,
    /// Status of the last response received
    pub last_status: Option<u16>,
    pub attempts: u32,
}

/// Poll configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Pause between attempts (default: 2s)
    pub retry_interval: Duration,

    /// Timeout of each individual request (default: 10s)
    pub request_timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Poll configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollConfigError {
    #[error("retry_interval_ms must be in (0, 60000], got {value}")]
    RetryIntervalOutOfBounds { value: u128 },

    #[error("request_timeout_seconds must be in (0, 300], got {value}")]
    RequestTimeoutOutOfBounds { value: u64 },
}

impl PollConfig {
    pub fn validate(&self) -> Result<(), PollConfigError> {
        if self.retry_interval.is_zero() || self.retry_interval > Duration::from_secs(60) {
            return Err(PollConfigError::RetryIntervalOutOfBounds {
                value: self.retry_interval.as_millis(),
            });
        }
        if self.request_timeout.is_zero() || self.request_timeout > Duration::from_secs(300) {
            return Err(PollConfigError::RequestTimeoutOutOfBounds {
                value: self.request_timeout.as_secs(),
            });
        }
        Ok(())
    }
}

/// Runs poll tasks over a transport
#[derive(Clone)]
pub struct Poller {
    transport: Arc<dyn Transport>,
    config: PollConfig,
}

impl Poller {
    pub fn new(transport: Arc<dyn Transport>, config: PollConfig) -> Self {
        Self { transport, config }
    }

    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Send a single request, without retry or 401 handling
    pub fn execute(&self, request: &HttpRequest, identity: &TlsIdentity) -> TargetResult<HttpResponse> {
        Ok(self
            .transport
            .execute(request, identity, self.config.request_timeout)?)
    }

    /// Poll `task` until it completes or `timeout` is reached
    ///
    /// Transient transport failures are retried like pending responses; if
    /// the deadline passes while the last attempt failed, that failure is
    /// returned instead of a timeout. Local setup failures end the poll.
    pub fn wait<T>(&self, task: &mut T, identity: &TlsIdentity, timeout: PollTimeout) -> TargetResult<PollOutcome>
    where
        T: PollTask + ?Sized,
    {
        let deadline = Deadline::start(timeout);
        let mut last_status = None;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            let request = task.build_request()?;
            debug!(method = %request.method, url = %request.full_url(), attempt = attempts, "polling");

            let mut failure = None;
            match self.execute(&request, identity) {
                Ok(response) => {
                    last_status = Some(response.status);
                    if response.status == UNAUTHORIZED {
                        return Err(TargetError::Unauthorized {
                            status: response.status,
                        });
                    }
                    if task.evaluate(&response)? == Progress::Done {
                        return Ok(PollOutcome {
                            completed: true,
                            last_status,
                            attempts,
                        });
                    }
                }
                Err(TargetError::Network(e)) if e.is_transient() => {
                    debug!(error = %e, "request failed");
                    failure = Some(e);
                }
                Err(e) => return Err(e),
            }

            match deadline.next_delay(self.config.retry_interval) {
                Some(delay) => thread::sleep(delay),
                None => {
                    if let Some(e) = failure {
                        return Err(e.into());
                    }
                    return match deadline.timeout() {
                        PollTimeout::After(limit) => Err(TargetError::Timeout {
                            timeout: limit,
                            last_status,
                        }),
                        _ => Ok(PollOutcome {
                            completed: false,
                            last_status,
                            attempts,
                        }),
                    };
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{MockTransport, TransportError};
    use std::time::Instant;

    fn poller(transport: Arc<MockTransport>) -> Poller {
        Poller::new(
            transport,
            PollConfig {
                retry_interval: Duration::from_millis(10),
                request_timeout: Duration::from_secs(1),
            },
        )
    }

    fn get() -> TargetResult<HttpRequest> {
        Ok(HttpRequest::get("https://api.example.com/status"))
    }

    fn ok_when_success(response: &HttpResponse) -> TargetResult<Progress> {
        Ok(if response.is_success() {
            Progress::Done
        } else {
            Progress::Pending
        })
    }

    #[test]
    fn test_done_on_first_attempt() {
        let transport = Arc::new(MockTransport::new());
        transport.push(200, "");
        let outcome = poller(transport.clone())
            .wait(&mut poll_fn(get, ok_when_success), &TlsIdentity::none(), PollTimeout::from_secs(5))
            .unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.last_status, Some(200));
    }

    #[test]
    fn test_retries_until_done_and_rebuilds_request() {
        let transport = Arc::new(MockTransport::new());
        transport.push(503, "").push(502, "").push(200, "");

        let mut builds = 0;
        let mut task = poll_fn(
            || {
                builds += 1;
                let mut request = HttpRequest::get("https://api.example.com/run/1");
                request.set_query("attempt", builds.to_string());
                Ok(request)
            },
            ok_when_success,
        );
        let outcome = poller(transport.clone())
            .wait(&mut task, &TlsIdentity::none(), PollTimeout::from_secs(5))
            .unwrap();

        assert_eq!(outcome.attempts, 3);
        let requests = transport.requests();
        assert_eq!(requests[0].query("attempt"), Some("1"));
        assert_eq!(requests[2].query("attempt"), Some("3"));
    }

    #[test]
    fn test_unauthorized_aborts_without_consulting_evaluator() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_always(401, "");

        let mut evaluated = false;
        let mut task = poll_fn(get, |_: &HttpResponse| {
            evaluated = true;
            Ok(Progress::Done)
        });
        let result = poller(transport.clone()).wait(&mut task, &TlsIdentity::none(), PollTimeout::Never);

        assert!(matches!(result, Err(TargetError::Unauthorized { status: 401 })));
        assert!(!evaluated);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_evaluator_error_is_fatal() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_always(200, "");
        let mut task = poll_fn(get, |_: &HttpResponse| -> TargetResult<Progress> {
            Err(TargetError::RunFailed {
                run_id: 1,
                status: "error".to_string(),
            })
        });
        let result = poller(transport.clone()).wait(&mut task, &TlsIdentity::none(), PollTimeout::from_secs(5));

        assert!(matches!(result, Err(TargetError::RunFailed { .. })));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_times_out_after_bound() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_always(200, "");
        let mut task = poll_fn(get, |_: &HttpResponse| Ok(Progress::Pending));

        let start = Instant::now();
        let result = poller(transport.clone()).wait(
            &mut task,
            &TlsIdentity::none(),
            PollTimeout::After(Duration::from_millis(100)),
        );
        let elapsed = start.elapsed();

        assert!(matches!(
            result,
            Err(TargetError::Timeout {
                last_status: Some(200),
                ..
            })
        ));
        assert!(elapsed >= Duration::from_millis(100), "returned too early: {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(2), "returned too late: {:?}", elapsed);
        assert!(transport.request_count() > 2);
    }

    #[test]
    fn test_once_makes_single_attempt_without_error() {
        let transport = Arc::new(MockTransport::new());
        transport.respond_always(503, "");
        let outcome = poller(transport.clone())
            .wait(&mut poll_fn(get, ok_when_success), &TlsIdentity::none(), PollTimeout::Once)
            .unwrap();

        assert!(!outcome.completed);
        assert_eq!(outcome.last_status, Some(503));
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_network_errors_are_retried() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_error(TransportError::ConnectionFailed("refused".into()))
            .push(200, "");
        let outcome = poller(transport.clone())
            .wait(&mut poll_fn(get, ok_when_success), &TlsIdentity::none(), PollTimeout::from_secs(5))
            .unwrap();
        assert!(outcome.completed);
        assert_eq!(outcome.attempts, 2);
    }

    #[test]
    fn test_network_error_surfaces_when_deadline_passes() {
        let transport = Arc::new(MockTransport::new());
        transport.push_error(TransportError::ConnectionFailed("refused".into()));
        let result = poller(transport).wait(
            &mut poll_fn(get, ok_when_success),
            &TlsIdentity::none(),
            PollTimeout::Once,
        );
        assert!(matches!(result, Err(TargetError::Network(_))));
    }

    #[test]
    fn test_client_setup_failure_is_not_retried() {
        let transport = Arc::new(MockTransport::new());
        transport
            .push_error(TransportError::Client("invalid client certificate".into()))
            .respond_always(200, "");

        let result = poller(transport.clone()).wait(
            &mut poll_fn(get, ok_when_success),
            &TlsIdentity::none(),
            PollTimeout::Never,
        );

        let err = result.unwrap_err();
        assert!(matches!(err, TargetError::Network(TransportError::Client(_))));
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
        assert_eq!(transport.request_count(), 1);
    }

    #[test]
    fn test_build_failure_is_fatal() {
        let transport = Arc::new(MockTransport::new());
        let mut task = poll_fn(
            || -> TargetResult<HttpRequest> { Err(TargetError::NoEndpoints) },
            ok_when_success,
        );
        let result = poller(transport.clone()).wait(&mut task, &TlsIdentity::none(), PollTimeout::Never);
        assert!(matches!(result, Err(TargetError::NoEndpoints)));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn test_config_validation() {
        assert!(PollConfig::default().validate().is_ok());
        let zero = PollConfig {
            retry_interval: Duration::ZERO,
            ..PollConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(PollConfigError::RetryIntervalOutOfBounds { value: 0 })
        ));
        let slow = PollConfig {
            request_timeout: Duration::from_secs(301),
            ..PollConfig::default()
        };
        assert!(matches!(
            slow.validate(),
            Err(PollConfigError::RequestTimeoutOutOfBounds { value: 301 })
        ));
    }
}
