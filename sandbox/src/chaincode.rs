//! Transaction entry points.
//!
//! `Chaincode` is what the hosting peer calls: `initialize` once, then
//! `dispatch` per transaction with a function name and positional args.
//! Every core error is turned into a failed [`Response`] here.

use std::sync::Arc;

use tracing::{debug, error};
use wasmcc_hostapi::Ledger;

use crate::config::SandboxConfig;
use crate::decoder::decode;
use crate::error::SandboxError;
use crate::host_impl::InvocationContext;
use crate::registry::ModuleRegistry;
use crate::result::{translate, Response};
use crate::runtime::Sandbox;

/// Payload of a successful install.
pub const INSTALL_SUCCESS: &str = "Success! Installed wasm chaincode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Install,
    Execute,
    List,
}

impl Command {
    fn parse(function: &str) -> Result<Self, SandboxError> {
        match function {
            "install" | "create" => Ok(Self::Install),
            "execute" => Ok(Self::Execute),
            "list" | "installedChaincodes" => Ok(Self::List),
            other => Err(SandboxError::InvalidArguments(format!(
                "unknown function {:?}, expected install, execute, or list",
                other
            ))),
        }
    }
}

/// The WASM chaincode host.
pub struct Chaincode {
    sandbox: Sandbox,
}

impl Chaincode {
    pub fn new(config: SandboxConfig) -> Result<Self, SandboxError> {
        Ok(Self::with_sandbox(Sandbox::new(config)?))
    }

    pub fn with_sandbox(sandbox: Sandbox) -> Self {
        Self { sandbox }
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Instantiation hook. Nothing to set up.
    pub fn initialize(&self) -> Response {
        Response::success(Vec::new())
    }

    /// Run one transaction against `ledger`.
    pub fn dispatch(&self, function: &str, args: &[Vec<u8>], ledger: Arc<dyn Ledger>) -> Response {
        debug!(function, args = args.len(), "dispatching transaction.");
        let result = Command::parse(function).and_then(|command| {
            let registry = ModuleRegistry::new(&self.sandbox, ledger);
            match command {
                Command::Install => self.install(&registry, args),
                Command::Execute => self.execute(&registry, args),
                Command::List => list(&registry),
            }
        });
        result
            .inspect_err(|err| error!(function, kind = ?err.kind(), "transaction failed: {}.", err))
            .unwrap_or_else(Response::from)
    }

    fn install(&self, registry: &ModuleRegistry<'_>, args: &[Vec<u8>]) -> Result<Response, SandboxError> {
        let [name, encoded, init_args @ ..] = args else {
            return Err(SandboxError::InvalidArguments(
                "install expects a name and encoded bytecode".into(),
            ));
        };
        let name = utf8_arg(name, "module name")?;
        let bytecode = decode(encoded)?;
        registry.install(name, &bytecode, init_args.to_vec())?;
        Ok(Response::success(INSTALL_SUCCESS))
    }

    fn execute(&self, registry: &ModuleRegistry<'_>, args: &[Vec<u8>]) -> Result<Response, SandboxError> {
        let [name, entry, call_args @ ..] = args else {
            return Err(SandboxError::InvalidArguments(
                "execute expects a module name and an entry function".into(),
            ));
        };
        let name = utf8_arg(name, "module name")?;
        let entry = utf8_arg(entry, "entry function")?;

        let bytecode = registry.lookup(name)?;
        let context = InvocationContext::new(name, registry.ledger(), call_args.to_vec());
        let outcome = self.sandbox.invoke(&bytecode, entry, context)?;
        Ok(translate(outcome.return_code, outcome.captured_result))
    }
}

fn list(registry: &ModuleRegistry<'_>) -> Result<Response, SandboxError> {
    let mut payload = Vec::new();
    for name in registry.list()? {
        payload.extend_from_slice(name?.as_bytes());
        payload.push(b'\n');
    }
    Ok(Response::success(payload))
}

fn utf8_arg<'a>(arg: &'a [u8], what: &str) -> Result<&'a str, SandboxError> {
    std::str::from_utf8(arg).map_err(|_| SandboxError::InvalidArguments(format!("{} is not valid UTF-8", what)))
}
