//! Convenient re-exports for common usage patterns.
//!
//! This module provides a single import to bring all commonly used types
//! into scope.
//!
//! # Example
//!
//! ```ignore
//! use simhost::prelude::*;
//!
//! let env = Environment::new()?;
//! let module = env.load_module(&wasm_bytes)?;
//! let mut runtime = env.create_runtime(&module)?;
//! runtime.initialize(&VarValues::new(), 0.0, None, None, LogLevel::Warn, true)?;
//! ```

// Unified error handling
pub use crate::error::{Error, Result};

// Factory and lifecycle types
pub use crate::environment::{Environment, Module, RuntimeOptions};
pub use crate::runtime::{DescriptionSizing, Phase, Runtime};

// Data model
pub use crate::model::{
    Capabilities, Causality, DoStepResponse, ExperimentInfo, GetValuesResponse, LogLevel,
    ModelDescription, ModelInfo, ModelVariable, Status, VarValues, VariableType, VariableValue,
};

// Codec and engine abstraction
pub use crate::codec::{Codec, CodecError};
pub use crate::host::{WasmHostError, WASM_PAGE_SIZE};
