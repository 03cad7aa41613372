//! Shared test helpers for integration tests.
//!
//! Provides the balance-transfer guest module, submission encoders, argument
//! builders, and chaincode factory functions used across all integration
//! test files.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::sync::Arc;

use wasmcc_hostapi::{Ledger, MemLedger};
use wasmcc_sandbox::{Chaincode, Response, SandboxConfig};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

// ── Guest Modules ──

/// Asset-transfer chaincode.
///
/// - `init(name1, value1, name2, value2)` seeds two balances
/// - `invoke(from, to, amount)` moves `amount` from `from` to `to`
/// - `query(name)` returns the decimal balance of `name`
/// - `delete(name)` removes `name`
///
/// Memory layout: messages at 0..512, argument lengths at 960, argument
/// slots of 256 bytes from 1024, state buffer at 2048, number buffer at 3072.
pub const BALANCE_WAT: &str = r#"
(module
  (import "env" "__print" (func $print (param i32 i32) (result i32)))
  (import "env" "__get_parameter" (func $get_parameter (param i32 i32) (result i32)))
  (import "env" "__get_state" (func $get_state (param i32 i32 i32) (result i32)))
  (import "env" "__put_state" (func $put_state (param i32 i32 i32 i32) (result i32)))
  (import "env" "__delete_state" (func $delete_state (param i32 i32) (result i32)))
  (import "env" "__return_result" (func $return_result (param i32 i32) (result i32)))
  (memory (export "memory") 1)

  (data (i32.const 0) "Incorrect number of arguments")
  (data (i32.const 64) "Expecting integer value")
  (data (i32.const 128) "Failed to get state")
  (data (i32.const 192) "Insufficient balance")
  (data (i32.const 256) "balance module initialized")
  (data (i32.const 320) "Failed to put state")

  (func $fail (param $ptr i32) (param $len i32) (result i32)
    (drop (call $return_result (local.get $ptr) (local.get $len)))
    (i32.const -1))

  (func $slot (param $i i32) (result i32)
    (i32.add (i32.const 1024) (i32.mul (local.get $i) (i32.const 256))))

  (func $arg_len (param $i i32) (result i32)
    (i32.load (i32.add (i32.const 960) (i32.shl (local.get $i) (i32.const 2)))))

  (func $load_arg (param $i i32)
    (i32.store
      (i32.add (i32.const 960) (i32.shl (local.get $i) (i32.const 2)))
      (call $get_parameter (local.get $i) (call $slot (local.get $i)))))

  ;; decimal digits to i64, -1 if empty or not a number
  (func $parse (param $ptr i32) (param $len i32) (result i64)
    (local $acc i64) (local $c i32)
    (if (i32.le_s (local.get $len) (i32.const 0)) (then (return (i64.const -1))))
    (block $done
      (loop $next
        (br_if $done (i32.eqz (local.get $len)))
        (local.set $c (i32.sub (i32.load8_u (local.get $ptr)) (i32.const 48)))
        (if (i32.gt_u (local.get $c) (i32.const 9)) (then (return (i64.const -1))))
        (local.set $acc
          (i64.add (i64.mul (local.get $acc) (i64.const 10)) (i64.extend_i32_u (local.get $c))))
        (local.set $ptr (i32.add (local.get $ptr) (i32.const 1)))
        (local.set $len (i32.sub (local.get $len) (i32.const 1)))
        (br $next)))
    (local.get $acc))

  ;; non-negative i64 to decimal at 3072, returns its length
  (func $format (param $v i64) (result i32)
    (local $n i32) (local $t i64) (local $i i32)
    (local.set $n (i32.const 1))
    (local.set $t (local.get $v))
    (block $counted
      (loop $count
        (br_if $counted (i64.lt_u (local.get $t) (i64.const 10)))
        (local.set $t (i64.div_u (local.get $t) (i64.const 10)))
        (local.set $n (i32.add (local.get $n) (i32.const 1)))
        (br $count)))
    (local.set $i (local.get $n))
    (loop $digit
      (local.set $i (i32.sub (local.get $i) (i32.const 1)))
      (i32.store8
        (i32.add (i32.const 3072) (local.get $i))
        (i32.add (i32.const 48) (i32.wrap_i64 (i64.rem_u (local.get $v) (i64.const 10)))))
      (local.set $v (i64.div_u (local.get $v) (i64.const 10)))
      (br_if $digit (i32.gt_s (local.get $i) (i32.const 0))))
    (local.get $n))

  (func $balance (param $i i32) (result i64)
    (local $len i32)
    (local.set $len
      (call $get_state (call $slot (local.get $i)) (call $arg_len (local.get $i)) (i32.const 2048)))
    (if (i32.lt_s (local.get $len) (i32.const 0)) (then (return (i64.const -1))))
    (call $parse (i32.const 2048) (local.get $len)))

  (func $store_balance (param $i i32) (param $v i64) (result i32)
    (call $put_state
      (call $slot (local.get $i)) (call $arg_len (local.get $i))
      (i32.const 3072) (call $format (local.get $v))))

  (func $store_arg (param $key i32) (param $value i32) (result i32)
    (call $put_state
      (call $slot (local.get $key)) (call $arg_len (local.get $key))
      (call $slot (local.get $value)) (call $arg_len (local.get $value))))

  (func (export "init") (param $argc i64) (result i32)
    (if (i64.ne (local.get $argc) (i64.const 4))
      (then (return (call $fail (i32.const 0) (i32.const 29)))))
    (call $load_arg (i32.const 0))
    (call $load_arg (i32.const 1))
    (call $load_arg (i32.const 2))
    (call $load_arg (i32.const 3))
    (if (i64.lt_s (call $parse (call $slot (i32.const 1)) (call $arg_len (i32.const 1))) (i64.const 0))
      (then (return (call $fail (i32.const 64) (i32.const 23)))))
    (if (i64.lt_s (call $parse (call $slot (i32.const 3)) (call $arg_len (i32.const 3))) (i64.const 0))
      (then (return (call $fail (i32.const 64) (i32.const 23)))))
    (if (call $store_arg (i32.const 0) (i32.const 1))
      (then (return (call $fail (i32.const 320) (i32.const 19)))))
    (if (call $store_arg (i32.const 2) (i32.const 3))
      (then (return (call $fail (i32.const 320) (i32.const 19)))))
    (drop (call $print (i32.const 256) (i32.const 26)))
    (i32.const 0))

  (func (export "invoke") (param $argc i64) (result i32)
    (local $from i64) (local $to i64) (local $amount i64)
    (if (i64.ne (local.get $argc) (i64.const 3))
      (then (return (call $fail (i32.const 0) (i32.const 29)))))
    (call $load_arg (i32.const 0))
    (call $load_arg (i32.const 1))
    (call $load_arg (i32.const 2))
    (local.set $from (call $balance (i32.const 0)))
    (local.set $to (call $balance (i32.const 1)))
    (if (i32.or (i64.lt_s (local.get $from) (i64.const 0)) (i64.lt_s (local.get $to) (i64.const 0)))
      (then (return (call $fail (i32.const 128) (i32.const 19)))))
    (local.set $amount (call $parse (call $slot (i32.const 2)) (call $arg_len (i32.const 2))))
    (if (i64.lt_s (local.get $amount) (i64.const 0))
      (then (return (call $fail (i32.const 64) (i32.const 23)))))
    (if (i64.gt_s (local.get $amount) (local.get $from))
      (then (return (call $fail (i32.const 192) (i32.const 20)))))
    (if (call $store_balance (i32.const 0) (i64.sub (local.get $from) (local.get $amount)))
      (then (return (call $fail (i32.const 320) (i32.const 19)))))
    (if (call $store_balance (i32.const 1) (i64.add (local.get $to) (local.get $amount)))
      (then (return (call $fail (i32.const 320) (i32.const 19)))))
    (i32.const 0))

  (func (export "query") (param $argc i64) (result i32)
    (local $len i32)
    (if (i64.ne (local.get $argc) (i64.const 1))
      (then (return (call $fail (i32.const 0) (i32.const 29)))))
    (call $load_arg (i32.const 0))
    (local.set $len
      (call $get_state (call $slot (i32.const 0)) (call $arg_len (i32.const 0)) (i32.const 2048)))
    (if (i32.lt_s (local.get $len) (i32.const 0))
      (then (return (call $fail (i32.const 128) (i32.const 19)))))
    (drop (call $return_result (i32.const 2048) (local.get $len)))
    (i32.const 0))

  (func (export "delete") (param $argc i64) (result i32)
    (if (i64.ne (local.get $argc) (i64.const 1))
      (then (return (call $fail (i32.const 0) (i32.const 29)))))
    (call $load_arg (i32.const 0))
    (call $delete_state (call $slot (i32.const 0)) (call $arg_len (i32.const 0))))
)
"#;

/// Assembled balance module.
pub fn balance_wasm() -> Vec<u8> {
    wat::parse_str(BALANCE_WAT).unwrap()
}

/// Assemble a module that only needs an initializer returning 0.
pub fn trivial_wasm() -> Vec<u8> {
    wat::parse_str(r#"(module (func (export "init") (param i64) (result i32) i32.const 0))"#).unwrap()
}

// ── Submission Encoders ──

/// Hex text submission.
pub fn as_hex(bytes: &[u8]) -> Vec<u8> {
    hex::encode(bytes).into_bytes()
}

/// Zip archive holding the given entries.
pub fn as_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

// ── Chaincode Helpers ──

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

pub fn chaincode() -> Chaincode {
    init_tracing();
    Chaincode::new(SandboxConfig::default()).unwrap()
}

pub fn chaincode_with_config(config: SandboxConfig) -> Chaincode {
    init_tracing();
    Chaincode::new(config).unwrap()
}

pub fn new_ledger() -> Arc<MemLedger> {
    Arc::new(MemLedger::new())
}

pub fn args(values: &[&str]) -> Vec<Vec<u8>> {
    values.iter().map(|v| v.as_bytes().to_vec()).collect()
}

/// `[name, submission, init_args...]` as install arguments.
pub fn install_args(name: &str, submission: Vec<u8>, init_args: &[&str]) -> Vec<Vec<u8>> {
    let mut all = vec![name.as_bytes().to_vec(), submission];
    all.extend(args(init_args));
    all
}

pub fn install(chaincode: &Chaincode, ledger: &Arc<MemLedger>, name: &str, submission: Vec<u8>, init_args: &[&str]) -> Response {
    chaincode.dispatch("install", &install_args(name, submission, init_args), ledger.clone())
}

pub fn execute(chaincode: &Chaincode, ledger: &Arc<MemLedger>, name: &str, entry: &str, call_args: &[&str]) -> Response {
    let mut all = args(&[name, entry]);
    all.extend(args(call_args));
    chaincode.dispatch("execute", &all, ledger.clone())
}

pub fn list(chaincode: &Chaincode, ledger: &Arc<MemLedger>) -> Vec<String> {
    let response = chaincode.dispatch("list", &[], ledger.clone());
    assert!(response.success, "list failed: {}", response.payload_str());
    response.payload_str().lines().map(str::to_owned).collect()
}

/// `kind` field of a structured failure payload.
pub fn failure_kind(response: &Response) -> String {
    assert!(!response.success, "expected failure, got {:?}", response);
    let value: serde_json::Value = serde_json::from_slice(&response.payload).unwrap();
    value["kind"].as_str().unwrap().to_string()
}

/// Raw ledger value for a module's guest key.
pub fn module_state(ledger: &Arc<MemLedger>, module: &str, key: &str) -> Option<Vec<u8>> {
    ledger.get_state(format!("{}_{}", module, key).as_bytes()).unwrap()
}
