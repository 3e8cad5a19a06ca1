//! Deployment target
//!
//! A target is one application deployment on one control plane system. It
//! resolves service handles, waits for deployment runs and tails the
//! deployment's logs.
//!
//! Discovered endpoints and run-log output are target state, so operations
//! that touch them take `&mut self`.

pub mod service;

pub use service::{Service, ServiceKind};

use std::io::Write;
use std::sync::Arc;

use hosted_api::{paths, CliVersionResponse, Deployment};
use semver::Version;
use tracing::{debug, info};

use crate::auth::{AuthStrategy, Authenticator};
use crate::endpoints::{ClusterEndpoints, EndpointDiscovery};
use crate::error::{TargetError, TargetResult};
use crate::host::{HttpRequest, TlsIdentity, Transport};
use crate::logs::{LogDecoder, LogOptions, LogTail, RunLogPrinter, TabSeparatedDecoder};
use crate::poll::{PollConfig, Poller, UNAUTHORIZED};
use crate::run::RunWaiter;
use crate::state::RunState;
use crate::system::{System, TargetType};
use crate::timeout::PollTimeout;

/// Destination of run-log output
pub type LogSink = Box<dyn Write + Send>;

/// One deployment on one control plane system
pub struct Target {
    authenticator: Authenticator,
    deployment: Deployment,
    poller: Poller,
    data_plane_identity: TlsIdentity,
    endpoints: ClusterEndpoints,
    run_log: Option<RunLogPrinter<LogSink>>,
    decoder: Box<dyn LogDecoder>,
}

impl Target {
    pub fn new(
        authenticator: Authenticator,
        deployment: Deployment,
        transport: Arc<dyn Transport>,
        config: PollConfig,
    ) -> Self {
        Self {
            authenticator,
            deployment,
            poller: Poller::new(transport, config),
            data_plane_identity: TlsIdentity::none(),
            endpoints: ClusterEndpoints::new(),
            run_log: None,
            decoder: Box::new(TabSeparatedDecoder),
        }
    }

    /// Identity presented to the deployment's own endpoints
    pub fn with_data_plane_identity(mut self, identity: TlsIdentity) -> Self {
        self.data_plane_identity = identity;
        self
    }

    /// Known endpoints; discovery is skipped while these are present
    pub fn with_endpoints(mut self, endpoints: ClusterEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Print run logs while waiting for runs
    pub fn with_run_log(mut self, printer: RunLogPrinter<LogSink>) -> Self {
        self.run_log = Some(printer);
        self
    }

    pub fn with_log_decoder(mut self, decoder: Box<dyn LogDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn system(&self) -> &System {
        self.authenticator.system()
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    pub fn target_type(&self) -> TargetType {
        self.system().target_type()
    }

    pub fn endpoints(&self) -> &ClusterEndpoints {
        &self.endpoints
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.authenticator
    }

    /// API key id of this deployment's requests
    fn key_id(&self) -> String {
        self.deployment.application.serialized_form()
    }

    /// Resolve a service handle
    ///
    /// For the deploy service a waiting `timeout` polls its health page
    /// first. Data plane services need endpoints: when none are known the
    /// target waits for `run_id` (if positive) and then discovers them.
    pub fn service(
        &mut self,
        kind: ServiceKind,
        timeout: PollTimeout,
        run_id: i64,
        cluster: &str,
    ) -> TargetResult<Service> {
        if !kind.is_data_plane() {
            let service = Service::new(
                kind,
                self.system().url.clone(),
                self.authenticator.identity().clone(),
                None,
                "",
                self.poller.clone(),
            );
            if timeout.waits() {
                let status = match service.wait(timeout) {
                    Ok(status) => status,
                    Err(TargetError::Timeout {
                        last_status: Some(status),
                        ..
                    }) => status,
                    Err(e) => return Err(e),
                };
                if !(200..300).contains(&status) {
                    return Err(TargetError::UnexpectedStatus {
                        service: kind.to_string(),
                        status,
                        url: service.base_url.clone(),
                    });
                }
            }
            return Ok(service);
        }

        if self.endpoints.is_empty() {
            if run_id > 0 {
                self.wait_for_run(run_id, timeout)?;
            }
            self.discover_endpoints(timeout)?;
        }
        let url = self.resolve_endpoint(cluster)?.to_string();
        Ok(Service::new(
            kind,
            url,
            self.data_plane_identity.clone(),
            Some(AuthStrategy::ClientCertificate),
            self.system().domain.clone(),
            self.poller.clone(),
        ))
    }

    /// URL of a discovered cluster
    pub fn resolve_endpoint(&self, cluster: &str) -> TargetResult<&str> {
        self.endpoints.resolve(cluster)
    }

    /// Wait for a deployment run to finish, printing its log if a run-log
    /// printer is attached
    ///
    /// Returns `Running` only for a `Once` wait on an active run.
    pub fn wait_for_run(&mut self, run_id: i64, timeout: PollTimeout) -> TargetResult<RunState> {
        let url = self.system().api_url(&paths::run(&self.deployment, run_id));
        let key_id = self.key_id();
        debug!(run_id, url = %url, "waiting for run");

        let mut waiter = RunWaiter::new(url, key_id, run_id, &self.authenticator, self.run_log.as_mut());
        self.poller
            .wait(&mut waiter, self.authenticator.identity(), timeout)?;
        Ok(waiter.state())
    }

    /// Read the deployment's zone endpoints, replacing the known ones
    pub fn discover_endpoints(&mut self, timeout: PollTimeout) -> TargetResult<&ClusterEndpoints> {
        let url = self.system().api_url(&paths::deployment(&self.deployment));
        let mut task = EndpointDiscovery::new(url, self.key_id(), &self.authenticator);

        let completed = match self
            .poller
            .wait(&mut task, self.authenticator.identity(), timeout)
        {
            Ok(outcome) => outcome.completed,
            Err(TargetError::Timeout { .. }) => false,
            Err(e) => return Err(e),
        };
        let discovered = task.into_endpoints();
        if !completed || discovered.is_empty() {
            return Err(TargetError::NoEndpointsDiscovered);
        }

        info!(deployment = %self.deployment, clusters = discovered.len(), "endpoints discovered");
        self.endpoints = discovered;
        Ok(&self.endpoints)
    }

    /// Print deployment log entries to `out`
    ///
    /// A non-follow tail that reaches its timeout ends normally.
    pub fn print_log(&self, options: &LogOptions, out: &mut dyn Write) -> TargetResult<()> {
        let url = self.system().api_url(&paths::logs(&self.deployment));
        let mut tail = LogTail::new(
            url,
            self.key_id(),
            &self.authenticator,
            self.decoder.as_ref(),
            options,
            out,
        );
        match self
            .poller
            .wait(&mut tail, self.authenticator.identity(), options.poll_timeout())
        {
            Ok(_) => Ok(()),
            Err(TargetError::Timeout { .. }) if !options.follow => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Fail if `client` is older than the oldest client the system accepts
    ///
    /// Any 0.0.0 version, with or without pre-release or build metadata,
    /// denotes a development build and always passes.
    pub fn check_version(&self, client: &Version) -> TargetResult<()> {
        if (client.major, client.minor, client.patch) == (0, 0, 0) {
            return Ok(());
        }
        let url = self.system().api_url(paths::CLI_VERSION);
        let response = self
            .poller
            .execute(&HttpRequest::get(url.clone()), self.authenticator.identity())?;
        if response.status == UNAUTHORIZED {
            return Err(TargetError::Unauthorized {
                status: response.status,
            });
        }
        if !response.is_success() {
            return Err(TargetError::UnexpectedStatus {
                service: "version".to_string(),
                status: response.status,
                url,
            });
        }

        let body: CliVersionResponse = serde_json::from_slice(&response.body)?;
        let minimum = Version::parse(body.min_version.trim())?;
        if *client < minimum {
            return Err(TargetError::UnsupportedVersion {
                client: client.clone(),
                minimum,
            });
        }
        Ok(())
    }
}
