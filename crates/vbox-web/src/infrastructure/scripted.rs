//! Scripted hypervisor gateway for tests.
//!
//! # Why a scripted gateway?
//!
//! The real [`VBoxManageGateway`](super::gateway::VBoxManageGateway) needs a
//! VirtualBox installation and actually starts and stops machines.  The
//! `ScriptedGateway` replaces the process launch with a closure that decides
//! the reply for each argument vector, and records every vector it was given
//! so tests can assert exactly which commands ran and in what order.
//!
//! It also measures concurrency.  Every invocation that names a VM counts as
//! "in flight" for that VM until its reply is returned, and the gateway keeps
//! the highest in-flight count seen per VM and overall.  Combined with
//! [`with_delay`](ScriptedGateway::with_delay) this lets a test prove that two
//! operations on one VM never overlapped while operations on different VMs
//! did.
//!
//! # Usage in tests
//!
//! ```ignore
//! let gateway = Arc::new(ScriptedGateway::inventory(&["dev"]));
//! let orchestrator = VmOrchestrator::new(gateway.clone(), config);
//!
//! orchestrator.send_keys("dev", "a").await.unwrap();
//!
//! let calls = gateway.invocations();
//! assert_eq!(calls[1], ["controlvm", "dev", "keyboardputscancode", "1e", "9e"]);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::gateway::{CommandOutput, GatewayError, HypervisorGateway};

/// Decides the reply for one argument vector.
pub type Responder = dyn Fn(&[String]) -> Result<CommandOutput, GatewayError> + Send + Sync;

/// In-memory gateway driven by a reply closure.
pub struct ScriptedGateway {
    responder: Box<Responder>,
    delay: Duration,
    invocations: Mutex<Vec<Vec<String>>>,
    concurrency: Mutex<Concurrency>,
}

#[derive(Default)]
struct Concurrency {
    in_flight: HashMap<String, usize>,
    max_per_vm: HashMap<String, usize>,
    total: usize,
    max_total: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Output of `list vms` for the given names, with made-up UUIDs.
pub fn vm_listing(names: &[&str]) -> CommandOutput {
    let text: String = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!("\"{name}\" {{00000000-0000-0000-0000-{i:012}}}\n"))
        .collect();
    CommandOutput::success(text)
}

/// The VM an argument vector targets, if any (`list vms` targets none).
fn target_vm(args: &[String]) -> Option<&str> {
    match args.first().map(String::as_str) {
        Some("startvm") | Some("controlvm") | Some("showvminfo") => {
            args.get(1).map(String::as_str)
        }
        _ => None,
    }
}

impl ScriptedGateway {
    /// Creates a gateway that answers every invocation with `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[String]) -> Result<CommandOutput, GatewayError> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            invocations: Mutex::new(Vec::new()),
            concurrency: Mutex::new(Concurrency::default()),
        }
    }

    /// A gateway that knows the VMs in `names`, all powered off.
    ///
    /// `list vms` returns the names; `showvminfo` returns a two-field dump
    /// with `VMState="poweroff"`; every other command succeeds silently.
    pub fn inventory(names: &[&str]) -> Self {
        let listing = vm_listing(names);
        Self::new(move |args| match args.first().map(String::as_str) {
            Some("list") => Ok(listing.clone()),
            Some("showvminfo") => Ok(CommandOutput::success(format!(
                "name=\"{}\"\nVMState=\"poweroff\"\n",
                args.get(1).map(String::as_str).unwrap_or_default()
            ))),
            _ => Ok(CommandOutput::default()),
        })
    }

    /// Makes every invocation take `delay` before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every argument vector received so far, in arrival order.
    pub fn invocations(&self) -> Vec<Vec<String>> {
        lock(&self.invocations).clone()
    }

    /// Argument vectors whose first element is `subcommand`.
    pub fn invocations_of(&self, subcommand: &str) -> Vec<Vec<String>> {
        lock(&self.invocations)
            .iter()
            .filter(|args| args.first().map(String::as_str) == Some(subcommand))
            .cloned()
            .collect()
    }

    /// Highest number of simultaneous invocations seen for `vm`.
    pub fn max_concurrency_for(&self, vm: &str) -> usize {
        lock(&self.concurrency)
            .max_per_vm
            .get(vm)
            .copied()
            .unwrap_or(0)
    }

    /// Highest number of simultaneous invocations seen across all VMs.
    pub fn max_concurrency(&self) -> usize {
        lock(&self.concurrency).max_total
    }

    fn enter(&self, vm: Option<&str>) {
        let mut c = lock(&self.concurrency);
        c.total += 1;
        c.max_total = c.max_total.max(c.total);
        if let Some(vm) = vm {
            let now = {
                let n = c.in_flight.entry(vm.to_string()).or_insert(0);
                *n += 1;
                *n
            };
            let max = c.max_per_vm.entry(vm.to_string()).or_insert(0);
            *max = (*max).max(now);
        }
    }

    fn leave(&self, vm: Option<&str>) {
        let mut c = lock(&self.concurrency);
        c.total = c.total.saturating_sub(1);
        if let Some(n) = vm.and_then(|vm| c.in_flight.get_mut(vm)) {
            *n = n.saturating_sub(1);
        }
    }
}

#[async_trait]
impl HypervisorGateway for ScriptedGateway {
    async fn execute(
        &self,
        args: &[String],
        _timeout: Duration,
    ) -> Result<CommandOutput, GatewayError> {
        lock(&self.invocations).push(args.to_vec());

        let vm = target_vm(args);
        self.enter(vm);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = (self.responder)(args);
        self.leave(vm);
        reply
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use vbox_core::protocol::parse_vm_list;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_vm_listing_parses_back_to_names() {
        let out = vm_listing(&["dev", "my vm"]);
        assert_eq!(parse_vm_list(&out.stdout_text()), vec!["dev", "my vm"]);
    }

    #[tokio::test]
    async fn test_inventory_records_invocations_in_order() {
        let gateway = ScriptedGateway::inventory(&["dev"]);

        gateway
            .execute(&args(&["list", "vms"]), Duration::from_secs(1))
            .await
            .unwrap();
        gateway
            .execute(&args(&["controlvm", "dev", "poweroff"]), Duration::from_secs(1))
            .await
            .unwrap();

        let calls = gateway.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], args(&["controlvm", "dev", "poweroff"]));
        assert_eq!(gateway.invocations_of("controlvm").len(), 1);
    }

    #[tokio::test]
    async fn test_responder_errors_are_returned() {
        let gateway = ScriptedGateway::new(|_| {
            Err(GatewayError::NonZeroExit {
                code: Some(1),
                stderr: "boom".into(),
            })
        });
        let err = gateway
            .execute(&args(&["list", "vms"]), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::NonZeroExit { .. }));
    }

    #[tokio::test]
    async fn test_sequential_calls_never_overlap() {
        let gateway = ScriptedGateway::inventory(&["dev"]).with_delay(Duration::from_millis(5));
        for _ in 0..3 {
            gateway
                .execute(&args(&["showvminfo", "dev"]), Duration::from_secs(1))
                .await
                .unwrap();
        }
        assert_eq!(gateway.max_concurrency_for("dev"), 1);
        assert_eq!(gateway.max_concurrency(), 1);
    }
}
