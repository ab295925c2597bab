//! Embedding host for co-simulation models packaged as WebAssembly
//! modules.
//!
//! A guest module publishes a self-describing variable schema, accepts
//! initial values, advances its internal clock in host-driven steps, and
//! exchanges values between steps. All traffic crosses the sandbox
//! boundary as binary messages staged in two pre-allocated regions of the
//! guest's linear memory; the whole memory can be snapshotted to bytes and
//! restored into a fresh instance of the same module.
//!
//! # Layers
//!
//! - [`host`]: narrow capability surface over the wasm engine
//! - [`codec`]: symmetric binary encoding of descriptions, bundles and
//!   request/response messages
//! - [`runtime`]: the per-instance state machine driving the protocol
//! - [`environment`]: factory root owning the engine
//!
//! # Example
//!
//! ```ignore
//! use simhost::prelude::*;
//!
//! let env = Environment::new()?;
//! let module = env.load_module(&std::fs::read("model.wasm")?)?;
//! let mut rt = env.create_runtime(&module)?;
//!
//! rt.initialize(&VarValues::new(), 0.0, Some(10.0), None, LogLevel::Warn, true)?;
//! while rt.current_time() < 10.0 {
//!     rt.do_step(rt.current_time(), 0.01)?;
//! }
//! ```

pub mod codec;
pub mod environment;
pub mod error;
pub mod host;
mod logging;
pub mod model;
pub mod prelude;
pub mod runtime;

pub use codec::{Codec, CodecError};
pub use environment::{
    Environment, Module, RuntimeOptions, DEFAULT_BUFFER_SIZE, DEFAULT_STACK_SIZE,
};
pub use error::{Error, Result};
pub use host::{WasmHostError, WASM_PAGE_SIZE};
pub use model::{
    Capabilities, Causality, DoStepResponse, ExperimentInfo, GetValuesResponse, LogLevel,
    ModelDescription, ModelInfo, ModelVariable, Status, VarValues, VariableType, VariableValue,
};
pub use runtime::{DescriptionSizing, Phase, Runtime};
