//! Deployment run waiting
//!
//! Polls the status of one run until it is no longer active. When a log
//! printer is attached, every observation's log is flushed and the `after`
//! cursor follows the newest message id, so later polls only carry new
//! messages.

use std::io::Write;

use hosted_api::{params, JobResponse, RUN_LOG_START};
use tracing::{debug, info, warn};

use crate::auth::Authenticator;
use crate::error::{TargetError, TargetResult};
use crate::host::{HttpRequest, HttpResponse};
use crate::logs::RunLogPrinter;
use crate::poll::{PollTask, Progress};
use crate::state::RunState;

/// Poll task waiting for a run to finish
pub struct RunWaiter<'a, W: Write> {
    url: String,
    key_id: String,
    run_id: i64,
    authenticator: &'a Authenticator,
    printer: Option<&'a mut RunLogPrinter<W>>,
    cursor: i64,
    state: RunState,
}

impl<'a, W: Write> RunWaiter<'a, W> {
    pub fn new(
        url: String,
        key_id: String,
        run_id: i64,
        authenticator: &'a Authenticator,
        printer: Option<&'a mut RunLogPrinter<W>>,
    ) -> Self {
        Self {
            url,
            key_id,
            run_id,
            authenticator,
            printer,
            cursor: RUN_LOG_START,
            state: RunState::Running,
        }
    }

    /// Id of the newest log message printed, -1 before any
    pub fn cursor(&self) -> i64 {
        self.cursor
    }

    pub fn state(&self) -> RunState {
        self.state
    }
}

impl<W: Write> PollTask for RunWaiter<'_, W> {
    fn build_request(&mut self) -> TargetResult<HttpRequest> {
        let mut request = HttpRequest::get(self.url.clone());
        request.set_query(params::AFTER, self.cursor.to_string());
        self.authenticator.sign(&mut request, &self.key_id)?;
        Ok(request)
    }

    fn evaluate(&mut self, response: &HttpResponse) -> TargetResult<Progress> {
        if !response.is_success() {
            debug!(run_id = self.run_id, status = response.status, "run status not available");
            return Ok(Progress::Pending);
        }
        let observation: JobResponse = match serde_json::from_slice(&response.body) {
            Ok(observation) => observation,
            Err(e) => {
                debug!(run_id = self.run_id, error = %e, "ignoring malformed run status");
                return Ok(Progress::Pending);
            }
        };

        if let Some(printer) = self.printer.as_deref_mut() {
            self.cursor = printer.flush(&observation, self.cursor)?;
        }

        let next = RunState::observed(observation.active, observation.is_success());
        self.state.transition(next)?;
        match next {
            RunState::Running => Ok(Progress::Pending),
            RunState::Succeeded => {
                info!(run_id = self.run_id, "run succeeded");
                Ok(Progress::Done)
            }
            RunState::Failed => {
                warn!(run_id = self.run_id, status = %observation.status, "run failed");
                Err(TargetError::RunFailed {
                    run_id: self.run_id,
                    status: observation.status,
                })
            }
        }
    }
}
