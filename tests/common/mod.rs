//! Common test utilities and fixtures.
//!
//! The integration suite drives real wasm guests assembled from WAT at
//! test time. The main fixture is a "spring" model (point mass on a linear
//! spring with an external force input); its model description blob is
//! produced by the crate's own encoder and embedded in the module as a
//! data segment, which is exactly how real modules ship theirs.

#![allow(dead_code)]

use simhost::prelude::*;

// =============================================================================
// Fixture model schema
// =============================================================================

/// Position, Real/Output, default 1.0.
pub const X_ID: i32 = 1;
/// Velocity, Real/Output, derivative of `x`, default 0.5.
pub const V_ID: i32 = 2;
/// External force, Real/Input, default 0.0.
pub const FORCE_ID: i32 = 3;
/// Spring constant, Real/Parameter, default 4.0.
pub const STIFFNESS_ID: i32 = 4;

/// Defaults as declared in the fixture description, keyed by id.
pub const DEFAULTS: [(i32, f64); 4] = [
    (X_ID, 1.0),
    (V_ID, 0.5),
    (FORCE_ID, 0.0),
    (STIFFNESS_ID, 4.0),
];

/// The description the spring guest publishes.
pub fn spring_description() -> ModelDescription {
    let real = |id: i32,
                name: &str,
                description: &str,
                unit: &str,
                causality: Causality,
                derivative_of_id: i32,
                default: f64| ModelVariable {
        id,
        name: name.into(),
        description: description.into(),
        unit: unit.into(),
        value_type: VariableType::Real,
        causality,
        derivative_of_id,
        default: Some(VariableValue::Real(default)),
    };

    ModelDescription {
        model: ModelInfo {
            id: "urn:simhost:spring".into(),
            name: "spring".into(),
            description: "Point mass on a linear spring with an external force input".into(),
            generation_tool: "simhost test fixtures".into(),
            generation_datetime: "2026-07-01T00:00:00Z".into(),
            name_delimiter: ".".into(),
            capabilities: Capabilities {
                can_handle_variable_step_size: true,
                can_reset_step: false,
                can_interpolate_inputs: false,
            },
        },
        experiment: Some(ExperimentInfo {
            time_step_min: 1e-6,
            time_step_max: 0.1,
            time_step_default: 0.01,
            start_time_default: 0.0,
            end_time_default: 10.0,
            time_unit: "s".into(),
        }),
        variables: vec![
            real(X_ID, "x", "Position", "m", Causality::Output, 0, 1.0),
            real(V_ID, "v", "Velocity", "m/s", Causality::Output, X_ID, 0.5),
            real(FORCE_ID, "force", "External force", "N", Causality::Input, 0, 0.0),
            real(
                STIFFNESS_ID,
                "stiffness",
                "Spring constant",
                "N/m",
                Causality::Parameter,
                0,
                4.0,
            ),
        ],
    }
}

/// The fixture description encoded with the crate's own codec.
pub fn description_bytes() -> Vec<u8> {
    Codec::new().model_description(&spring_description()).to_vec()
}

// =============================================================================
// WAT guests
// =============================================================================

/// Render bytes as a WAT data-segment string (`\hh` escapes throughout).
fn data_segment(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("\\{b:02x}")).collect()
}

/// Shared WAT prologue: exported memory, a bump allocator whose pointer
/// lives in linear memory (so snapshots capture it), and a
/// `getModelDescription` that copies the embedded description blob.
fn guest_prologue(md: &[u8]) -> String {
    format!(
        r#"
  (memory (export "memory") 2)
  (data (i32.const 0) "\00\10\00\00")
  (data (i32.const 1024) "{segment}")

  (func (export "alloc") (param $len i32) (result i32)
    (local $base i32)
    (local $end i32)
    (local $need i32)
    (local.set $base
      (i32.and (i32.add (i32.load (i32.const 0)) (i32.const 7)) (i32.const -8)))
    (local.set $end (i32.add (local.get $base) (local.get $len)))
    (local.set $need
      (i32.div_u (i32.add (local.get $end) (i32.const 65535)) (i32.const 65536)))
    (if (i32.gt_u (local.get $need) (memory.size))
      (then
        (if (i32.eq
              (memory.grow (i32.sub (local.get $need) (memory.size)))
              (i32.const -1))
          (then (return (i32.const 0))))))
    (i32.store (i32.const 0) (local.get $end))
    (local.get $base))

  (func (export "dealloc") (param $ptr i32))

  (func (export "getModelDescription") (param $out i32) (param $cap i32) (result i32)
    (if (i32.le_u (i32.const {md_len}) (local.get $cap))
      (then (memory.copy (local.get $out) (i32.const 1024) (i32.const {md_len}))))
    (i32.const {md_len}))
"#,
        segment = data_segment(md),
        md_len = md.len(),
    )
}

/// The well-behaved spring guest.
///
/// Layout of its private state in linear memory: bump pointer at 0, clock
/// at 8, one f64 slot per variable id at `16 + id * 8`. `doStep`
/// integrates `x' = v`, `v' = force - stiffness * x` with explicit Euler.
pub fn spring_module_wat() -> String {
    let md = description_bytes();
    format!(
        r#"(module
{prologue}
  (func $vals (param $id i32) (result i32)
    (i32.add (i32.const 16) (i32.mul (local.get $id) (i32.const 8))))

  (func (export "init") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (local $p i32)
    (local $n i32)
    (local $i i32)
    (local.set $p
      (i32.add (i32.add (local.get $in) (i32.const 4)) (i32.load (local.get $in))))
    (f64.store (i32.const 8) (f64.load (local.get $p)))
    (f64.store (call $vals (i32.const 1)) (f64.const 1.0))
    (f64.store (call $vals (i32.const 2)) (f64.const 0.5))
    (f64.store (call $vals (i32.const 3)) (f64.const 0.0))
    (f64.store (call $vals (i32.const 4)) (f64.const 4.0))
    ;; real section of the initial bundle starts after the scalar fields
    (local.set $p (i32.add (local.get $p) (i32.const 31)))
    (local.set $n (i32.load (local.get $p)))
    (local.set $p (i32.add (local.get $p) (i32.const 4)))
    (local.set $i (i32.const 0))
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (f64.store
          (call $vals (i32.load (local.get $p)))
          (f64.load (i32.add (local.get $p) (i32.const 4))))
        (local.set $p (i32.add (local.get $p) (i32.const 12)))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))
    (if (i32.lt_u (local.get $cap) (i32.const 4))
      (then (return (i32.const 4))))
    (i32.store (local.get $out) (i32.const 0))
    (i32.const 4))

  (func (export "setValues") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (local $p i32)
    (local $n i32)
    (local $i i32)
    (local.set $n (i32.load (local.get $in)))
    (local.set $p (i32.add (local.get $in) (i32.const 4)))
    (local.set $i (i32.const 0))
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (f64.store
          (call $vals (i32.load (local.get $p)))
          (f64.load (i32.add (local.get $p) (i32.const 4))))
        (local.set $p (i32.add (local.get $p) (i32.const 12)))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))
    (if (i32.lt_u (local.get $cap) (i32.const 4))
      (then (return (i32.const 4))))
    (i32.store (local.get $out) (i32.const 0))
    (i32.const 4))

  (func (export "getValues") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (local $n i32)
    (local $len i32)
    (local $i i32)
    (local $p i32)
    (local $id i32)
    (local.set $n (i32.load (local.get $in)))
    (local.set $len (i32.add (i32.const 29) (i32.mul (local.get $n) (i32.const 12))))
    (if (i32.gt_u (local.get $len) (local.get $cap))
      (then (return (local.get $len))))
    (i32.store (local.get $out) (i32.const 0))
    (f64.store (i32.add (local.get $out) (i32.const 4)) (f64.load (i32.const 8)))
    (i32.store8 (i32.add (local.get $out) (i32.const 12)) (i32.const 1))
    (i32.store (i32.add (local.get $out) (i32.const 13)) (local.get $n))
    (local.set $p (i32.add (local.get $out) (i32.const 17)))
    (local.set $i (i32.const 0))
    (block $done
      (loop $next
        (br_if $done (i32.ge_u (local.get $i) (local.get $n)))
        (local.set $id
          (i32.load (i32.add (i32.add (local.get $in) (i32.const 4))
                             (i32.mul (local.get $i) (i32.const 4)))))
        (i32.store (local.get $p) (local.get $id))
        (f64.store (i32.add (local.get $p) (i32.const 4))
                   (f64.load (call $vals (local.get $id))))
        (local.set $p (i32.add (local.get $p) (i32.const 12)))
        (local.set $i (i32.add (local.get $i) (i32.const 1)))
        (br $next)))
    (i32.store (local.get $p) (i32.const 0))
    (i32.store (i32.add (local.get $p) (i32.const 4)) (i32.const 0))
    (i32.store (i32.add (local.get $p) (i32.const 8)) (i32.const 0))
    (local.get $len))

  (func (export "doStep") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (local $t f64)
    (local $dt f64)
    (local $x f64)
    (local $v f64)
    (if (i32.lt_u (local.get $cap) (i32.const 12))
      (then (return (i32.const 12))))
    (local.set $dt (f64.load (i32.add (local.get $in) (i32.const 8))))
    (local.set $t (f64.add (f64.load (local.get $in)) (local.get $dt)))
    (local.set $x (f64.load (call $vals (i32.const 1))))
    (local.set $v (f64.load (call $vals (i32.const 2))))
    (local.set $x (f64.add (local.get $x) (f64.mul (local.get $dt) (local.get $v))))
    (local.set $v
      (f64.add (local.get $v)
        (f64.mul (local.get $dt)
          (f64.sub (f64.load (call $vals (i32.const 3)))
                   (f64.mul (f64.load (call $vals (i32.const 4))) (local.get $x))))))
    (f64.store (call $vals (i32.const 1)) (local.get $x))
    (f64.store (call $vals (i32.const 2)) (local.get $v))
    (f64.store (i32.const 8) (local.get $t))
    (i32.store (local.get $out) (i32.const 0))
    (f64.store (i32.add (local.get $out) (i32.const 4)) (local.get $t))
    (i32.const 12)))
"#,
        prologue = guest_prologue(&md),
    )
}

/// A hostile guest: accepts `init`, rejects `setValues` with a negative
/// length, claims an absurd response length from `getValues`, and reports
/// a fatal status from `doStep`.
pub fn faulty_module_wat() -> String {
    let md = description_bytes();
    format!(
        r#"(module
{prologue}
  (func (export "init") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (i32.store (local.get $out) (i32.const 0))
    (i32.const 4))

  (func (export "setValues") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (i32.const -1))

  (func (export "getValues") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (i32.const 1000000))

  (func (export "doStep") (param $in i32) (param $in_len i32) (param $out i32) (param $cap i32) (result i32)
    (i32.store (local.get $out) (i32.const 4))
    (f64.store (i32.add (local.get $out) (i32.const 4)) (f64.load (local.get $in)))
    (i32.const 12)))
"#,
        prologue = guest_prologue(&md),
    )
}

pub fn spring_module_bytes() -> Vec<u8> {
    wat::parse_str(spring_module_wat()).expect("spring fixture must assemble")
}

pub fn faulty_module_bytes() -> Vec<u8> {
    wat::parse_str(faulty_module_wat()).expect("faulty fixture must assemble")
}

// =============================================================================
// Runtime helpers
// =============================================================================

/// Environment + loaded spring module.
pub fn spring_env() -> anyhow::Result<(Environment, Module)> {
    let env = Environment::new()?;
    let module = env.load_module(&spring_module_bytes())?;
    Ok((env, module))
}

/// A fresh spring runtime with default options.
pub fn spring_runtime() -> anyhow::Result<Runtime> {
    let (env, module) = spring_env()?;
    Ok(env.create_runtime(&module)?)
}

/// A spring runtime already initialized with its declared defaults.
pub fn initialized_spring_runtime() -> anyhow::Result<Runtime> {
    let mut runtime = spring_runtime()?;
    let status = runtime.initialize(&VarValues::new(), 0.0, None, None, LogLevel::Warn, true)?;
    anyhow::ensure!(status == Status::Ok, "fixture init must report OK");
    Ok(runtime)
}

/// Bundle with a single real value.
pub fn real_bundle(entries: &[(i32, f64)]) -> VarValues {
    let mut values = VarValues::new();
    for (id, val) in entries {
        values.real_values.insert(*id, *val);
    }
    values
}
