//! VM control orchestrator.
//!
//! # What does the orchestrator do? (for beginners)
//!
//! Each HTTP request names one VM and one thing to do with it.  The
//! orchestrator turns that into hypervisor invocations while guaranteeing
//! two things:
//!
//! 1. **Validation happens first.**  An unknown action, a bad VM name, or
//!    keystroke text with an unknown key is rejected before the hypervisor
//!    CLI is ever started.
//! 2. **One operation per VM at a time.**  Every operation that touches a VM
//!    holds that VM's lock from the moment it checks the VM exists until its
//!    last invocation returns.  A long line of keystrokes sent in several
//!    batches is therefore never interleaved with a power-off.
//!
//! ```text
//!  request ──► validate ──► lock(vm) ──► list vms ──► invocation(s) ──► unlock ──► response
//! ```
//!
//! Lifecycle actions are never retried.  Whatever the gateway reports is
//! handed back to the caller unchanged.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use vbox_core::protocol::{commands, parse_machine_readable, parse_vm_list, vm_state};
use vbox_core::{
    pack_batches, translate, ControlAction, InvalidAction, TranslateError, VmName, VmNameError,
    VmRunState,
};

use super::locks::VmLockRegistry;
use super::screenshot::ScreenshotService;
use crate::domain::{
    ControlResponse, ErrorResponse, InfoResponse, KeysResponse, Screenshot, ServerConfig,
    StatusResponse,
};
use crate::infrastructure::gateway::{GatewayError, HypervisorGateway};

/// Failure of an orchestrated operation.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    InvalidAction(#[from] InvalidAction),

    #[error("invalid VM name: {0}")]
    InvalidVmName(#[from] VmNameError),

    #[error("unknown VM: {0}")]
    UnknownVm(String),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ControlError {
    /// Stable classification string exposed to the browser.
    pub fn kind(&self) -> &'static str {
        match self {
            ControlError::InvalidAction(_) => "InvalidAction",
            ControlError::InvalidVmName(_) => "InvalidVmName",
            ControlError::UnknownVm(_) => "UnknownVm",
            ControlError::Translate(TranslateError::UnknownKey(_)) => "UnknownKey",
            ControlError::Translate(TranslateError::MalformedInput(_)) => "MalformedInput",
            ControlError::Gateway(e) => e.kind().as_str(),
        }
    }

    /// `true` for errors caused by the request itself rather than the host.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ControlError::InvalidAction(_)
                | ControlError::InvalidVmName(_)
                | ControlError::Translate(_)
        )
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            kind: self.kind().to_string(),
        }
    }
}

/// Serializes and executes VM operations against a [`HypervisorGateway`].
pub struct VmOrchestrator {
    gateway: Arc<dyn HypervisorGateway>,
    locks: VmLockRegistry,
    screenshots: ScreenshotService,
    config: ServerConfig,
}

impl VmOrchestrator {
    pub fn new(gateway: Arc<dyn HypervisorGateway>, config: ServerConfig) -> Self {
        let screenshots = ScreenshotService::new(
            Arc::clone(&gateway),
            config.screenshot_dir.clone(),
            config.command_timeout,
        );
        Self {
            gateway,
            locks: VmLockRegistry::new(),
            screenshots,
            config,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Names of all registered VMs, in the hypervisor's order.
    ///
    /// Takes no per-VM lock; it does not touch any single VM.
    pub async fn list_vms(&self) -> Result<Vec<String>, ControlError> {
        let output = self
            .gateway
            .execute(&commands::list_vms(), self.config.command_timeout)
            .await
            .inspect_err(|e| warn!(error = %e, "listing VMs failed"))?;
        Ok(parse_vm_list(&output.stdout_text()))
    }

    /// Fails with `UnknownVm` unless `vm` appears in the hypervisor's listing.
    async fn ensure_registered(&self, vm: &VmName) -> Result<(), ControlError> {
        let names = self.list_vms().await?;
        if names.iter().any(|n| n == vm.as_str()) {
            Ok(())
        } else {
            debug!(vm = %vm, "VM is not registered");
            Err(ControlError::UnknownVm(vm.to_string()))
        }
    }

    /// Starts, powers off, or saves the state of `vm`.
    ///
    /// # Errors
    ///
    /// `InvalidAction` and `InvalidVmName` are returned before any
    /// invocation.  Gateway failures are returned as-is; nothing is retried.
    pub async fn control(&self, vm: &str, action: &str) -> Result<ControlResponse, ControlError> {
        let action: ControlAction = action.parse()?;
        let vm = VmName::parse(vm)?;

        let _guard = self.locks.acquire(&vm).await;
        self.ensure_registered(&vm).await?;

        info!(vm = %vm, action = %action, "lifecycle action");
        self.gateway
            .execute(
                &commands::control(&vm, action, &self.config.start_type),
                self.config.lifecycle_timeout,
            )
            .await
            .inspect_err(|e| warn!(vm = %vm, action = %action, error = %e, "lifecycle action failed"))?;

        Ok(ControlResponse::ok(vm.as_str(), action))
    }

    /// Types `text` into `vm`.
    ///
    /// The whole text is translated before anything is sent, so one unknown
    /// key rejects the request without a single keystroke reaching the guest.
    /// The scancodes are then sent in batches of at most
    /// `max_scancodes_per_call` bytes, with `inter_batch_delay` between
    /// batches, all while holding the VM's lock.
    ///
    /// If a batch fails, earlier batches have already been typed; the error
    /// is returned and the rest is not sent.
    pub async fn send_keys(&self, vm: &str, text: &str) -> Result<KeysResponse, ControlError> {
        let vm = VmName::parse(vm)?;
        let actions = translate(text)?;
        let keys_sent = actions.iter().filter(|a| a.is_press()).count();

        if actions.is_empty() {
            return Ok(KeysResponse {
                vm: vm.to_string(),
                keys_sent: 0,
            });
        }

        let _guard = self.locks.acquire(&vm).await;
        self.ensure_registered(&vm).await?;

        let batches = pack_batches(&actions, self.config.max_scancodes_per_call);
        debug!(vm = %vm, keys = keys_sent, batches = batches.len(), "sending keystrokes");

        for (i, batch) in batches.iter().enumerate() {
            if i > 0 && !self.config.inter_batch_delay.is_zero() {
                tokio::time::sleep(self.config.inter_batch_delay).await;
            }
            self.gateway
                .execute(
                    &commands::put_scancodes(&vm, batch),
                    self.config.command_timeout,
                )
                .await
                .inspect_err(|e| {
                    warn!(vm = %vm, batch = i, error = %e, "scancode injection failed")
                })?;
        }

        Ok(KeysResponse {
            vm: vm.to_string(),
            keys_sent,
        })
    }

    /// Fetches the machine-readable dump of `vm` under its lock.
    async fn machine_info(
        &self,
        vm: &VmName,
    ) -> Result<vbox_core::protocol::MachineInfo, ControlError> {
        let _guard = self.locks.acquire(vm).await;
        self.ensure_registered(vm).await?;

        let output = self
            .gateway
            .execute(&commands::show_vm_info(vm), self.config.command_timeout)
            .await
            .inspect_err(|e| warn!(vm = %vm, error = %e, "showvminfo failed"))?;
        Ok(parse_machine_readable(&output.stdout_text()))
    }

    /// Current run state of `vm`, derived from the hypervisor on every call.
    ///
    /// A dump without a state field, or with a state we do not recognise,
    /// yields [`VmRunState::Unknown`] rather than an error.
    pub async fn status(&self, vm: &str) -> Result<StatusResponse, ControlError> {
        let vm = VmName::parse(vm)?;
        let info = self.machine_info(&vm).await?;

        let raw_state = vm_state(&info).map(str::to_string);
        let state = raw_state
            .as_deref()
            .map(VmRunState::from_raw)
            .unwrap_or(VmRunState::Unknown);

        Ok(StatusResponse {
            vm: vm.to_string(),
            state,
            raw_state,
        })
    }

    /// Every configuration field of `vm`, uninterpreted.
    pub async fn info(&self, vm: &str) -> Result<InfoResponse, ControlError> {
        let vm = VmName::parse(vm)?;
        let fields = self.machine_info(&vm).await?;
        Ok(InfoResponse {
            vm: vm.to_string(),
            fields,
        })
    }

    /// Screen capture of `vm`; never fails.
    ///
    /// A bad name, an unregistered VM, or any capture failure yields the
    /// placeholder image.
    pub async fn screenshot(&self, vm: &str) -> Screenshot {
        let vm = match VmName::parse(vm) {
            Ok(vm) => vm,
            Err(e) => {
                debug!(error = %e, "screenshot requested for invalid VM name");
                return ScreenshotService::placeholder();
            }
        };

        let _guard = self.locks.acquire(&vm).await;
        if self.ensure_registered(&vm).await.is_err() {
            return ScreenshotService::placeholder();
        }
        self.screenshots.capture(&vm).await
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
