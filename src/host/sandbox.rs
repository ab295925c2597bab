//! Wasmtime-backed execution sandbox for one guest instance.
//!
//! This is the only file that touches the engine API directly. The runtime
//! above it consumes a deliberately narrow surface: typed export calls,
//! bounds-checked memory windows, size/grow, and whole-memory copies.
//! Nothing here hands out raw pointers into guest memory; every access
//! re-fetches the memory view through the store, so growth can never
//! invalidate host-held state.

use wasmtime::{Engine, Instance, Linker, Memory, Store, TypedFunc};

use super::WasmHostError;

/// Wasm page size in bytes.
pub const WASM_PAGE_SIZE: usize = 65536;

/// Export names every guest module must provide.
pub const REQUIRED_EXPORTS: [&str; 8] = [
    "memory",
    "alloc",
    "dealloc",
    "getModelDescription",
    "init",
    "getValues",
    "setValues",
    "doStep",
];

/// The four-argument lifecycle entry points a sandbox can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuestCall {
    Init,
    GetValues,
    SetValues,
    DoStep,
    ResetStep,
    Terminate,
}

impl GuestCall {
    pub fn export_name(self) -> &'static str {
        match self {
            GuestCall::Init => "init",
            GuestCall::GetValues => "getValues",
            GuestCall::SetValues => "setValues",
            GuestCall::DoStep => "doStep",
            GuestCall::ResetStep => "resetStep",
            GuestCall::Terminate => "terminate",
        }
    }
}

type LifecycleFunc = TypedFunc<(i32, i32, i32, i32), i32>;

/// One instantiated guest with its resolved exports.
pub struct Sandbox {
    store: Store<()>,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    dealloc: TypedFunc<i32, ()>,
    get_model_description: TypedFunc<(i32, i32), i32>,
    init: LifecycleFunc,
    get_values: LifecycleFunc,
    set_values: LifecycleFunc,
    do_step: LifecycleFunc,
    reset_step: Option<LifecycleFunc>,
    terminate: Option<LifecycleFunc>,
}

impl std::fmt::Debug for Sandbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sandbox").finish_non_exhaustive()
    }
}

fn resolve<P, R>(
    store: &mut Store<()>,
    instance: &Instance,
    name: &str,
) -> Result<TypedFunc<P, R>, WasmHostError>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    let func = instance
        .get_func(&mut *store, name)
        .ok_or_else(|| WasmHostError::MissingExport(name.to_string()))?;
    func.typed::<P, R>(&*store)
        .map_err(|e| WasmHostError::BadSignature {
            name: name.to_string(),
            reason: e.to_string(),
        })
}

fn resolve_optional<P, R>(
    store: &mut Store<()>,
    instance: &Instance,
    name: &str,
) -> Result<Option<TypedFunc<P, R>>, WasmHostError>
where
    P: wasmtime::WasmParams,
    R: wasmtime::WasmResults,
{
    match instance.get_func(&mut *store, name) {
        None => Ok(None),
        Some(func) => func
            .typed::<P, R>(&*store)
            .map(Some)
            .map_err(|e| WasmHostError::BadSignature {
                name: name.to_string(),
                reason: e.to_string(),
            }),
    }
}

impl Sandbox {
    /// Instantiate the module and resolve its protocol exports.
    ///
    /// If the guest exports a `_initialize` start-up function (reactor
    /// convention), it is called here, before any protocol call.
    pub fn new(engine: &Engine, module: &wasmtime::Module) -> Result<Self, WasmHostError> {
        let linker: Linker<()> = Linker::new(engine);
        let mut store = Store::new(engine, ());

        let instance = linker
            .instantiate(&mut store, module)
            .map_err(|e| WasmHostError::Instantiate(e.to_string()))?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| WasmHostError::MissingExport("memory".to_string()))?;

        if let Some(start) = resolve_optional::<(), ()>(&mut store, &instance, "_initialize")? {
            start
                .call(&mut store, ())
                .map_err(|e| WasmHostError::Trap(e.to_string()))?;
        }

        let alloc = resolve(&mut store, &instance, "alloc")?;
        let dealloc = resolve(&mut store, &instance, "dealloc")?;
        let get_model_description = resolve(&mut store, &instance, "getModelDescription")?;
        let init = resolve(&mut store, &instance, "init")?;
        let get_values = resolve(&mut store, &instance, "getValues")?;
        let set_values = resolve(&mut store, &instance, "setValues")?;
        let do_step = resolve(&mut store, &instance, "doStep")?;
        let reset_step = resolve_optional(&mut store, &instance, "resetStep")?;
        let terminate = resolve_optional(&mut store, &instance, "terminate")?;

        Ok(Self {
            store,
            memory,
            alloc,
            dealloc,
            get_model_description,
            init,
            get_values,
            set_values,
            do_step,
            reset_step,
            terminate,
        })
    }

    /// Reserve `len` bytes in the guest heap.
    pub fn alloc(&mut self, len: i32) -> Result<i32, WasmHostError> {
        let ptr = self
            .alloc
            .call(&mut self.store, len)
            .map_err(|e| WasmHostError::Trap(e.to_string()))?;
        if ptr == 0 {
            return Err(WasmHostError::AllocFailed { len });
        }
        Ok(ptr)
    }

    /// Release a prior [`Sandbox::alloc`] result.
    pub fn dealloc(&mut self, ptr: i32) -> Result<(), WasmHostError> {
        self.dealloc
            .call(&mut self.store, ptr)
            .map_err(|e| WasmHostError::Trap(e.to_string()))
    }

    pub fn get_model_description(&mut self, out: i32, cap: i32) -> Result<i32, WasmHostError> {
        self.get_model_description
            .call(&mut self.store, (out, cap))
            .map_err(|e| WasmHostError::Trap(e.to_string()))
    }

    /// Dispatch one lifecycle call `(in, in_len, out, cap) -> len`.
    pub fn call(
        &mut self,
        call: GuestCall,
        in_ptr: i32,
        in_len: i32,
        out_ptr: i32,
        out_cap: i32,
    ) -> Result<i32, WasmHostError> {
        let func = match call {
            GuestCall::Init => self.init.clone(),
            GuestCall::GetValues => self.get_values.clone(),
            GuestCall::SetValues => self.set_values.clone(),
            GuestCall::DoStep => self.do_step.clone(),
            GuestCall::ResetStep => self
                .reset_step
                .clone()
                .ok_or_else(|| WasmHostError::MissingExport(call.export_name().to_string()))?,
            GuestCall::Terminate => self
                .terminate
                .clone()
                .ok_or_else(|| WasmHostError::MissingExport(call.export_name().to_string()))?,
        };
        func.call(&mut self.store, (in_ptr, in_len, out_ptr, out_cap))
            .map_err(|e| WasmHostError::Trap(e.to_string()))
    }

    /// Current linear memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.memory.data_size(&self.store)
    }

    /// Current linear memory size in pages.
    pub fn memory_pages(&self) -> u64 {
        self.memory.size(&self.store)
    }

    /// Copy `bytes` into guest memory at `offset`.
    pub fn write_memory(&mut self, offset: usize, bytes: &[u8]) -> Result<(), WasmHostError> {
        let size = self.memory.data_size(&self.store);
        let end = offset + bytes.len();
        if end > size {
            return Err(WasmHostError::MemoryAccess {
                offset,
                len: bytes.len(),
                size,
            });
        }
        self.memory.data_mut(&mut self.store)[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    /// Copy `len` bytes out of guest memory at `offset`.
    pub fn read_memory(&self, offset: usize, len: usize) -> Result<Vec<u8>, WasmHostError> {
        let data = self.memory.data(&self.store);
        data.get(offset..offset + len)
            .map(|slice| slice.to_vec())
            .ok_or(WasmHostError::MemoryAccess {
                offset,
                len,
                size: data.len(),
            })
    }

    /// Copy the entire linear memory verbatim.
    pub fn snapshot_memory(&self) -> Vec<u8> {
        self.memory.data(&self.store).to_vec()
    }

    /// Overwrite the first `bytes.len()` bytes of linear memory.
    ///
    /// Memory must already be at least that large; trailing bytes are left
    /// untouched.
    pub fn restore_memory(&mut self, bytes: &[u8]) -> Result<(), WasmHostError> {
        self.write_memory(0, bytes)
    }

    /// Grow linear memory to exactly `pages` pages (no-op if already there).
    pub fn grow_to(&mut self, pages: u64) -> Result<(), WasmHostError> {
        let current = self.memory.size(&self.store);
        if pages <= current {
            return Ok(());
        }
        self.memory
            .grow(&mut self.store, pages - current)
            .map(|_| ())
            .map_err(|e| WasmHostError::MemoryGrow {
                pages,
                reason: e.to_string(),
            })
    }
}
