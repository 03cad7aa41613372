//! Host import resolution and registration via the Wasmtime linker.
//!
//! A guest module imports its host functions from the `env` namespace. Each
//! import is resolved to a [`HostImport`]; an unknown `(namespace, name)`
//! pair is an [`UnknownImport`] error, surfaced as invalid bytecode rather
//! than an abort.
//!
//! Guest toolchains disagree on integer widths (C declares `int`, Rust
//! `usize`/`i64`), so host functions are registered with the exact type the
//! guest declared. Each call then:
//! 1. Converts the integer arguments to 32-bit offsets/lengths
//! 2. Validates every offset/length pair against linear memory
//! 3. Performs the operation through [`HostAbi`]
//! 4. Returns the result code in the declared width (`-1` on any failure)

use tracing::debug;
use wasmtime::{
    Caller, ExternType, FuncType, Global, GlobalType, ImportType, Linker, Memory, Module,
    Mutability, Store, Val, ValType,
};

use wasmcc_hostapi::{HostAbi, HostError, HOST_FAILURE};

use crate::error::SandboxError;
use crate::host_impl::HostState;
use crate::memory::{self, val_to_u32};

/// Namespace every host import lives in.
pub const HOST_MODULE: &str = "env";

/// Value of the `__constant_variable` global.
pub const CONSTANT_VARIABLE: i64 = 424;

/// Host functions callable from guest code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostFunction {
    /// `(ptr, len) -> 0`
    Print,
    /// `(index, dest_ptr) -> len | -1`
    GetParameter,
    /// `(key_ptr, key_len, dest_ptr) -> len | -1`
    GetState,
    /// `(key_ptr, key_len, val_ptr, val_len) -> 0 | -1`
    PutState,
    /// `(key_ptr, key_len) -> 0 | -1`
    DeleteState,
    /// `(ptr, len) -> 0`
    ReturnResult,
}

impl HostFunction {
    /// Number of integer parameters the guest must declare.
    pub fn arity(self) -> usize {
        match self {
            Self::Print | Self::GetParameter | Self::DeleteState | Self::ReturnResult => 2,
            Self::GetState => 3,
            Self::PutState => 4,
        }
    }
}

/// A resolved guest import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostImport {
    Function(HostFunction),
    ConstantVariable,
}

/// A guest import the host does not provide.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown import {module}::{name}")]
pub struct UnknownImport {
    pub module: String,
    pub name: String,
}

impl From<UnknownImport> for SandboxError {
    fn from(err: UnknownImport) -> Self {
        SandboxError::InvalidBytecode(err.to_string())
    }
}

/// Resolve a `(namespace, name)` import pair.
pub fn resolve(module: &str, name: &str) -> Result<HostImport, UnknownImport> {
    let resolved = match (module, name) {
        (HOST_MODULE, "__print") => HostImport::Function(HostFunction::Print),
        (HOST_MODULE, "__get_parameter") => HostImport::Function(HostFunction::GetParameter),
        (HOST_MODULE, "__get_state") => HostImport::Function(HostFunction::GetState),
        (HOST_MODULE, "__put_state") => HostImport::Function(HostFunction::PutState),
        (HOST_MODULE, "__delete_state") => HostImport::Function(HostFunction::DeleteState),
        (HOST_MODULE, "__return_result") => HostImport::Function(HostFunction::ReturnResult),
        (HOST_MODULE, "__constant_variable") => HostImport::ConstantVariable,
        _ => {
            return Err(UnknownImport {
                module: module.to_string(),
                name: name.to_string(),
            })
        }
    };
    Ok(resolved)
}

fn is_integer(vt: &ValType) -> bool {
    matches!(vt, ValType::I32 | ValType::I64)
}

/// Resolve one import and check that its declared type is one the host can serve.
pub fn resolve_import(import: &ImportType<'_>) -> Result<HostImport, SandboxError> {
    let resolved = resolve(import.module(), import.name())?;
    let qualified = format!("{}::{}", import.module(), import.name());

    match (resolved, import.ty()) {
        (HostImport::Function(function), ExternType::Func(ty)) => {
            check_function_type(function, &ty)
                .map_err(|reason| SandboxError::InvalidBytecode(format!("{}: {}", qualified, reason)))?;
        }
        (HostImport::ConstantVariable, ExternType::Global(ty)) => {
            if !is_integer(ty.content()) || ty.mutability() != Mutability::Const {
                return Err(SandboxError::InvalidBytecode(format!(
                    "{}: must be an immutable i32 or i64 global",
                    qualified
                )));
            }
        }
        _ => {
            return Err(SandboxError::InvalidBytecode(format!(
                "{}: wrong import kind",
                qualified
            )));
        }
    }
    Ok(resolved)
}

fn check_function_type(function: HostFunction, ty: &FuncType) -> Result<(), String> {
    let params: Vec<ValType> = ty.params().collect();
    let results: Vec<ValType> = ty.results().collect();
    if params.len() != function.arity() || !params.iter().all(is_integer) {
        return Err(format!(
            "expected {} integer params, got {} params",
            function.arity(),
            params.len()
        ));
    }
    if results.len() > 1 || !results.iter().all(is_integer) {
        return Err(format!(
            "expected at most one integer result, got {} results",
            results.len()
        ));
    }
    Ok(())
}

/// Define every import of `module` in `linker`.
///
/// Globals need a store to live in, so the linker is built per store.
pub fn link_imports(
    linker: &mut Linker<HostState>,
    store: &mut Store<HostState>,
    module: &Module,
) -> Result<(), SandboxError> {
    for import in module.imports() {
        let resolved = resolve_import(&import)?;
        let name = import.name();
        let defined = match (resolved, import.ty()) {
            (HostImport::Function(function), ExternType::Func(ty)) => {
                debug!("resolved host function {}::{}.", HOST_MODULE, name);
                register_function(linker, name, function, ty)
            }
            (HostImport::ConstantVariable, ExternType::Global(ty)) => {
                debug!("resolved host global {}::{}.", HOST_MODULE, name);
                define_constant(linker, store, name, ty)
            }
            _ => Err(anyhow::anyhow!("wrong import kind")),
        };
        defined.map_err(|e| SandboxError::InvalidBytecode(format!("{}::{}: {:#}", HOST_MODULE, name, e)))?;
    }
    Ok(())
}

fn define_constant(
    linker: &mut Linker<HostState>,
    store: &mut Store<HostState>,
    name: &str,
    ty: GlobalType,
) -> anyhow::Result<()> {
    let value = match ty.content() {
        ValType::I32 => Val::I32(CONSTANT_VARIABLE as i32),
        _ => Val::I64(CONSTANT_VARIABLE),
    };
    let global = Global::new(&mut *store, ty, value)?;
    linker.define(&*store, HOST_MODULE, name, global)?;
    Ok(())
}

fn register_function(
    linker: &mut Linker<HostState>,
    name: &str,
    function: HostFunction,
    ty: FuncType,
) -> anyhow::Result<()> {
    let wide_result = ty.results().next().map(|vt| matches!(vt, ValType::I64));
    linker.func_new(
        HOST_MODULE,
        name,
        ty,
        move |mut caller: Caller<'_, HostState>, params: &[Val], results: &mut [Val]| {
            let code = call_host(function, &mut caller, params);
            if let (Some(slot), Some(wide)) = (results.first_mut(), wide_result) {
                *slot = if wide { Val::I64(code) } else { Val::I32(code as i32) };
            }
            Ok(())
        },
    )?;
    Ok(())
}

/// Run one host function and fold any failure into the guest return code.
fn call_host(function: HostFunction, caller: &mut Caller<'_, HostState>, params: &[Val]) -> i64 {
    let args: Option<Vec<u32>> = params.iter().map(val_to_u32).collect();
    let Some(args) = args else {
        return HOST_FAILURE;
    };

    let outcome = match function {
        HostFunction::Print => host_print(caller, args[0], args[1]),
        HostFunction::GetParameter => host_get_parameter(caller, args[0], args[1]),
        HostFunction::GetState => host_get_state(caller, args[0], args[1], args[2]),
        HostFunction::PutState => host_put_state(caller, args[0], args[1], args[2], args[3]),
        HostFunction::DeleteState => host_delete_state(caller, args[0], args[1]),
        HostFunction::ReturnResult => host_return_result(caller, args[0], args[1]),
    };

    outcome.unwrap_or_else(|e| {
        debug!(
            module = %caller.data().context.module_name(),
            "host function {:?} failed: {}",
            function,
            e
        );
        e.to_return_code()
    })
}

/// Get the guest's exported memory from a Caller.
fn get_memory(caller: &mut Caller<'_, HostState>) -> Result<Memory, HostError> {
    caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or(HostError::NoMemory)
}

fn read_guest(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) -> Result<Vec<u8>, HostError> {
    let mem = get_memory(caller)?;
    memory::read_bytes(mem.data(&*caller), ptr, len)
}

fn write_guest(caller: &mut Caller<'_, HostState>, ptr: u32, data: &[u8]) -> Result<(), HostError> {
    let mem = get_memory(caller)?;
    memory::write_bytes(mem.data_mut(&mut *caller), ptr, data)
}

fn host_print(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) -> Result<i64, HostError> {
    let message = read_guest(caller, ptr, len)?;
    caller.data_mut().print(&message);
    Ok(0)
}

fn host_get_parameter(caller: &mut Caller<'_, HostState>, index: u32, dest_ptr: u32) -> Result<i64, HostError> {
    let Some(param) = caller.data().get_parameter(index as usize).map(<[u8]>::to_vec) else {
        return Ok(HOST_FAILURE);
    };
    write_guest(caller, dest_ptr, &param)?;
    Ok(param.len() as i64)
}

fn host_get_state(
    caller: &mut Caller<'_, HostState>,
    key_ptr: u32,
    key_len: u32,
    dest_ptr: u32,
) -> Result<i64, HostError> {
    let key = read_guest(caller, key_ptr, key_len)?;
    let Some(value) = caller.data().get_state(&key)? else {
        return Ok(HOST_FAILURE);
    };
    write_guest(caller, dest_ptr, &value)?;
    Ok(value.len() as i64)
}

fn host_put_state(
    caller: &mut Caller<'_, HostState>,
    key_ptr: u32,
    key_len: u32,
    val_ptr: u32,
    val_len: u32,
) -> Result<i64, HostError> {
    let key = read_guest(caller, key_ptr, key_len)?;
    let value = read_guest(caller, val_ptr, val_len)?;
    caller.data_mut().put_state(&key, &value)?;
    Ok(0)
}

fn host_delete_state(caller: &mut Caller<'_, HostState>, key_ptr: u32, key_len: u32) -> Result<i64, HostError> {
    let key = read_guest(caller, key_ptr, key_len)?;
    caller.data_mut().delete_state(&key)?;
    Ok(0)
}

fn host_return_result(caller: &mut Caller<'_, HostState>, ptr: u32, len: u32) -> Result<i64, HostError> {
    let result = read_guest(caller, ptr, len)?;
    caller.data_mut().return_result(&result)?;
    Ok(0)
}
