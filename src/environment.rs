//! Factory and lifetime root for modules and runtimes.
//!
//! An [`Environment`] owns the wasm engine and the configured guest stack
//! size; it produces [`Module`]s from byte buffers and [`Runtime`]s from
//! modules. Multiple runtimes may derive from one module; each runtime
//! owns its own execution instance.

use wasmtime::Config;

use crate::error::{Error, Result};
use crate::host::{WasmHostError, REQUIRED_EXPORTS};
use crate::logging::info;
use crate::runtime::{DescriptionSizing, Runtime};

/// Default guest stack size in bytes.
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Default scratch-region capacity in bytes.
pub const DEFAULT_BUFFER_SIZE: u32 = 8192;

/// Per-runtime construction knobs.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeOptions {
    /// Capacity of each of the two scratch regions.
    pub buffer_size: u32,
    /// Policy when the model description exceeds `buffer_size`.
    pub description_sizing: DescriptionSizing,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            description_sizing: DescriptionSizing::default(),
        }
    }
}

/// Owns the wasm engine and the default guest stack size.
pub struct Environment {
    engine: wasmtime::Engine,
    stack_size: usize,
}

impl Environment {
    /// Create an environment with the default guest stack size.
    pub fn new() -> Result<Self> {
        Self::with_stack_size(DEFAULT_STACK_SIZE)
    }

    /// Create an environment whose guests run under `stack_bytes` of wasm
    /// stack.
    pub fn with_stack_size(stack_bytes: usize) -> Result<Self> {
        let mut config = Config::new();
        config.max_wasm_stack(stack_bytes);
        let engine = wasmtime::Engine::new(&config)
            .map_err(|e| Error::Host(WasmHostError::Engine(e.to_string())))?;
        info!(stack_bytes, "environment created");
        Ok(Self {
            engine,
            stack_size: stack_bytes,
        })
    }

    /// Configured guest stack size in bytes.
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Parse and validate a guest module from its binary encoding.
    ///
    /// All eight protocol exports (`memory` plus the seven functions) must
    /// be present; signatures are checked later, when a runtime links
    /// against them.
    pub fn load_module(&self, bytes: &[u8]) -> Result<Module> {
        let module = wasmtime::Module::new(&self.engine, bytes)
            .map_err(|e| Error::Host(WasmHostError::Load(e.to_string())))?;

        for name in REQUIRED_EXPORTS {
            if module.get_export(name).is_none() {
                return Err(Error::Host(WasmHostError::MissingExport(name.to_string())));
            }
        }

        Ok(Module { module })
    }

    /// Create a runtime with default options.
    pub fn create_runtime(&self, module: &Module) -> Result<Runtime> {
        self.create_runtime_with(module, RuntimeOptions::default())
    }

    /// Create a runtime with explicit buffer sizing.
    pub fn create_runtime_with(&self, module: &Module, options: RuntimeOptions) -> Result<Runtime> {
        Runtime::new(
            &self.engine,
            &module.module,
            options.buffer_size,
            options.description_sizing,
        )
    }
}

/// A parsed and export-validated guest module.
///
/// Cheap to clone; runtimes derived from the same module are independent
/// instances.
#[derive(Clone, Debug)]
pub struct Module {
    module: wasmtime::Module,
}
