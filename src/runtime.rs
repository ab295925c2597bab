//! The co-simulation runtime: one guest instance driven through the
//! two-region embedding protocol.
//!
//! A [`Runtime`] owns an execution sandbox, a pair of pre-allocated scratch
//! regions in guest memory, and a cached copy of the module's model
//! description. Every operation stages a request in `in_region`, invokes
//! the matching guest export with `(in, in_len, out, cap)`, then decodes
//! the response the guest wrote to `out_region`.
//!
//! # Lifecycle
//!
//! ```text
//! Fresh ──initialize──▶ Initialized ──do_step──▶ Stepping ──do_step──▶ ...
//!                            │                       │
//!                            └─ get/set_values ──────┘
//! ```
//!
//! `initialize` and `load_state` may be called from any live phase to
//! reset the simulation; everything else requires a prior `initialize` or
//! `load_state`. A fatal guest status, a buffer overrun or a trap moves
//! the runtime to `Terminated`, after which every operation fails with a
//! precondition error.

use std::collections::HashMap;

use crate::codec::{decode, Codec};
use crate::error::{Error, Result};
use crate::host::{GuestCall, Sandbox, WASM_PAGE_SIZE};
use crate::logging::{debug, error, info, trace, warn};
use crate::model::{
    Causality, DoStepResponse, GetValuesResponse, LogLevel, ModelDescription, Status, VarValues,
    VariableType,
};

/// Lifecycle phase of a [`Runtime`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed; only the description accessor, `initialize` and
    /// `load_state` are legal.
    Fresh,
    /// `initialize` or `load_state` succeeded; stepping may begin.
    Initialized,
    /// At least one step has been taken.
    Stepping,
    /// Unusable; a fatal fault occurred or `terminate` was called.
    Terminated,
}

/// How construction reacts when the model description exceeds the
/// configured scratch capacity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DescriptionSizing {
    /// Fail construction with [`Error::BufferTooSmall`] naming the
    /// required length.
    #[default]
    Fail,
    /// Release both regions, round the capacity up to the next KiB that
    /// fits, re-acquire and retry.
    Resize,
}

/// Declared type and causality of one variable, indexed for validation.
#[derive(Debug)]
struct VarInfo {
    value_type: VariableType,
    causality: Causality,
}

/// A single embedded simulation instance.
#[derive(Debug)]
pub struct Runtime {
    sandbox: Sandbox,
    codec: Codec,
    buffer_size: u32,
    in_region: i32,
    out_region: i32,
    description: ModelDescription,
    var_infos: HashMap<i32, VarInfo>,
    phase: Phase,
    time: f64,
}

impl Runtime {
    /// Instantiate a module and run the construction protocol: reserve the
    /// two scratch regions, fetch and verify the model description, cache
    /// it.
    pub(crate) fn new(
        engine: &wasmtime::Engine,
        module: &wasmtime::Module,
        buffer_size: u32,
        sizing: DescriptionSizing,
    ) -> Result<Self> {
        let mut sandbox = Sandbox::new(engine, module)?;
        let mut capacity = buffer_size;
        let mut out_region = sandbox.alloc(capacity as i32)?;
        let mut in_region = sandbox.alloc(capacity as i32)?;

        let len = loop {
            let len = sandbox.get_model_description(out_region, capacity as i32)?;
            if len < 0 {
                return Err(Error::GuestFault(len));
            }
            if len as usize <= capacity as usize {
                break len as usize;
            }
            match sizing {
                DescriptionSizing::Fail => {
                    return Err(Error::BufferTooSmall {
                        need: len as usize,
                        have: capacity as usize,
                    });
                }
                DescriptionSizing::Resize => {
                    sandbox.dealloc(in_region)?;
                    sandbox.dealloc(out_region)?;
                    capacity = crate::codec::buffer::round_up(len as usize, 1024) as u32;
                    debug!(capacity, "resizing scratch regions for model description");
                    out_region = sandbox.alloc(capacity as i32)?;
                    in_region = sandbox.alloc(capacity as i32)?;
                }
            }
        };

        let bytes = sandbox.read_memory(out_region as usize, len)?;
        let description = decode::model_description(&bytes)?;

        let mut var_infos = HashMap::with_capacity(description.variables.len());
        for var in &description.variables {
            var_infos.insert(
                var.id,
                VarInfo {
                    value_type: var.value_type,
                    causality: var.causality,
                },
            );
        }

        info!(
            model = %description.model.name,
            variables = description.variables.len(),
            buffer_size = capacity,
            "runtime constructed"
        );

        Ok(Self {
            sandbox,
            codec: Codec::new(),
            buffer_size: capacity,
            in_region,
            out_region,
            description,
            var_infos,
            phase: Phase::Fresh,
            time: 0.0,
        })
    }

    /// The model description the guest exposed at construction.
    ///
    /// Cached and immutable: every call observes the identical value.
    pub fn model_description(&self) -> &ModelDescription {
        &self.description
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Host mirror of the guest's internal clock.
    ///
    /// Advanced by successful `do_step` calls (and rewound by
    /// `reset_step`). After `load_state` it reflects the restored guest
    /// only once the next step reports its time.
    pub fn current_time(&self) -> f64 {
        self.time
    }

    /// Effective scratch-region capacity in bytes.
    ///
    /// Equals the configured buffer size unless the resize policy grew it
    /// during construction.
    pub fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    /// Seed the simulation and move to `Initialized`.
    ///
    /// Legal from any live phase; re-invoking resets the simulation. The
    /// returned status is the guest's verbatim verdict.
    pub fn initialize(
        &mut self,
        initial_values: &VarValues,
        start_time: f64,
        end_time: Option<f64>,
        tolerance: Option<f64>,
        log_level: LogLevel,
        check: bool,
    ) -> Result<Status> {
        self.require_live("initialize")?;
        self.check_bundle_types(initial_values)?;

        let req = self.codec.init_req(
            &self.description.model.id,
            start_time,
            end_time,
            tolerance,
            log_level,
            check,
            initial_values,
        );
        let dispatched = dispatch(
            &mut self.sandbox,
            GuestCall::Init,
            self.in_region,
            self.out_region,
            self.buffer_size,
            req,
        );
        let bytes = self.finish_dispatch(dispatched)?;
        let status = decode::status_res(&bytes)?;
        self.observe_status(status);
        if matches!(status, Status::Ok | Status::Warning) {
            self.phase = Phase::Initialized;
            self.time = start_time;
            info!(start_time, "simulation initialized");
        }
        Ok(status)
    }

    /// Read current values for the given variable ids.
    pub fn get_values(&mut self, ids: &[i32]) -> Result<GetValuesResponse> {
        self.require_running("get_values")?;
        for id in ids {
            self.lookup(*id)?;
        }

        let req = self.codec.get_values_req(ids);
        let dispatched = dispatch(
            &mut self.sandbox,
            GuestCall::GetValues,
            self.in_region,
            self.out_region,
            self.buffer_size,
            req,
        );
        let bytes = self.finish_dispatch(dispatched)?;
        let response = decode::get_values_res(&bytes)?;
        self.check_response_bundle(&response.values)?;
        self.observe_status(response.status);
        Ok(response)
    }

    /// Write input and parameter values between steps.
    pub fn set_values(&mut self, values: &VarValues) -> Result<Status> {
        self.require_running("set_values")?;
        self.check_bundle_writable(values)?;

        let req = self.codec.set_values_req(values);
        let dispatched = dispatch(
            &mut self.sandbox,
            GuestCall::SetValues,
            self.in_region,
            self.out_region,
            self.buffer_size,
            req,
        );
        let bytes = self.finish_dispatch(dispatched)?;
        let status = decode::status_res(&bytes)?;
        self.observe_status(status);
        Ok(status)
    }

    /// Advance the guest clock by `timestep` starting from `current_time`.
    ///
    /// On success the host time mirror adopts the reported updated time
    /// and the runtime enters `Stepping`.
    pub fn do_step(&mut self, current_time: f64, timestep: f64) -> Result<DoStepResponse> {
        self.require_running("do_step")?;

        let req = self.codec.do_step_req(current_time, timestep);
        let dispatched = dispatch(
            &mut self.sandbox,
            GuestCall::DoStep,
            self.in_region,
            self.out_region,
            self.buffer_size,
            req,
        );
        let bytes = self.finish_dispatch(dispatched)?;
        let response = decode::do_step_res(&bytes)?;
        self.observe_status(response.status);
        if matches!(response.status, Status::Ok | Status::Warning) {
            self.time = response.updated_time;
            self.phase = Phase::Stepping;
        }
        Ok(response)
    }

    /// Ask the guest to roll its clock back to `time`.
    ///
    /// Requires the optional `resetStep` export (advertised by the
    /// `can_reset_step` capability); absence is an error but does not
    /// poison the runtime.
    pub fn reset_step(&mut self, time: f64) -> Result<Status> {
        self.require_running("reset_step")?;

        let req = self.codec.reset_step_req(time);
        let dispatched = dispatch(
            &mut self.sandbox,
            GuestCall::ResetStep,
            self.in_region,
            self.out_region,
            self.buffer_size,
            req,
        );
        let bytes = self.finish_dispatch(dispatched)?;
        let status = decode::status_res(&bytes)?;
        self.observe_status(status);
        if status == Status::Ok {
            self.time = time;
        }
        Ok(status)
    }

    /// Tell the guest the simulation is over and retire the runtime.
    ///
    /// Requires the optional `terminate` export. On a completed call the
    /// runtime moves to `Terminated` whatever the guest answered.
    pub fn terminate(&mut self) -> Result<Status> {
        self.require_live("terminate")?;

        let dispatched = dispatch(
            &mut self.sandbox,
            GuestCall::Terminate,
            self.in_region,
            self.out_region,
            self.buffer_size,
            &[],
        );
        let bytes = self.finish_dispatch(dispatched)?;
        let status = decode::status_res(&bytes)?;
        self.phase = Phase::Terminated;
        info!("runtime terminated");
        Ok(status)
    }

    /// Snapshot the guest's entire linear memory.
    ///
    /// The scratch regions are released before the copy so the snapshot
    /// never captures live scratch, then re-acquired afterwards (the new
    /// offsets need not match the old ones).
    pub fn save_state(&mut self) -> Result<Vec<u8>> {
        self.require_live("save_state")?;

        self.sandbox.dealloc(self.in_region)?;
        self.sandbox.dealloc(self.out_region)?;

        let snapshot = self.sandbox.snapshot_memory();

        self.out_region = self.sandbox.alloc(self.buffer_size as i32)?;
        self.in_region = self.sandbox.alloc(self.buffer_size as i32)?;

        debug!(bytes = snapshot.len(), "memory snapshot taken");
        Ok(snapshot)
    }

    /// Restore a prior [`Runtime::save_state`] snapshot into this
    /// instance and move to `Initialized`.
    ///
    /// The snapshot must come from the same module; the host validates
    /// only that its length is a positive page multiple. Memory grows as
    /// needed; if current memory is larger, trailing bytes are left
    /// untouched.
    pub fn load_state(&mut self, snapshot: &[u8]) -> Result<()> {
        self.require_live("load_state")?;

        if snapshot.is_empty() || snapshot.len() % WASM_PAGE_SIZE != 0 {
            return Err(Error::InvalidSnapshot {
                size: snapshot.len(),
            });
        }

        let pages = (snapshot.len() / WASM_PAGE_SIZE) as u64;
        if self.sandbox.memory_pages() < pages {
            self.sandbox.grow_to(pages)?;
        }
        self.sandbox.restore_memory(snapshot)?;

        // The restored allocator state supersedes the live one, so the old
        // region offsets are meaningless now.
        self.out_region = self.sandbox.alloc(self.buffer_size as i32)?;
        self.in_region = self.sandbox.alloc(self.buffer_size as i32)?;

        self.phase = Phase::Initialized;
        info!(bytes = snapshot.len(), "memory snapshot restored");
        Ok(())
    }

    fn require_live(&self, operation: &'static str) -> Result<()> {
        if self.phase == Phase::Terminated {
            return Err(Error::Precondition {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn require_running(&self, operation: &'static str) -> Result<()> {
        match self.phase {
            Phase::Initialized | Phase::Stepping => Ok(()),
            phase => Err(Error::Precondition { operation, phase }),
        }
    }

    fn observe_status(&mut self, status: Status) {
        if status.is_fatal() {
            warn!("guest reported fatal status, runtime terminated");
            self.phase = Phase::Terminated;
        }
    }

    /// Reset the codec scratch and apply the termination policy to a
    /// dispatch outcome.
    fn finish_dispatch(&mut self, result: Result<Vec<u8>>) -> Result<Vec<u8>> {
        self.codec.reset();
        if let Err(err) = &result {
            if err.poisons_runtime() {
                error!(cause = %err, "fatal protocol error, runtime terminated");
                self.phase = Phase::Terminated;
            }
        }
        result
    }

    fn lookup(&self, id: i32) -> Result<&VarInfo> {
        self.var_infos.get(&id).ok_or(Error::UnknownVariableId(id))
    }

    fn check_type(&self, id: i32, got: VariableType) -> Result<&VarInfo> {
        let info = self.lookup(id)?;
        if info.value_type != got {
            return Err(Error::VariableTypeMismatch {
                id,
                declared: info.value_type,
                got,
            });
        }
        Ok(info)
    }

    /// Every id must exist and sit in the bundle section matching its
    /// declared type.
    fn check_bundle_types(&self, values: &VarValues) -> Result<()> {
        for id in values.real_values.keys() {
            self.check_type(*id, VariableType::Real)?;
        }
        for id in values.int_values.keys() {
            self.check_type(*id, VariableType::Int)?;
        }
        for id in values.bool_values.keys() {
            self.check_type(*id, VariableType::Bool)?;
        }
        for id in values.string_values.keys() {
            self.check_type(*id, VariableType::String)?;
        }
        Ok(())
    }

    /// Type check plus writability: only Input and Parameter variables may
    /// be set.
    fn check_bundle_writable(&self, values: &VarValues) -> Result<()> {
        self.check_bundle_types(values)?;
        let ids = values
            .real_values
            .keys()
            .chain(values.int_values.keys())
            .chain(values.bool_values.keys())
            .chain(values.string_values.keys());
        for id in ids {
            let info = self.lookup(*id)?;
            if !info.causality.is_writable() {
                return Err(Error::CausalityForbidsSet {
                    id: *id,
                    causality: info.causality,
                });
            }
        }
        Ok(())
    }

    /// Guests must answer with declared ids in the right sections too.
    fn check_response_bundle(&self, values: &VarValues) -> Result<()> {
        self.check_bundle_types(values)
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Best effort: if the guest cannot release the regions the memory
        // is abandoned and the instance torn down anyway.
        let _ = self.sandbox.dealloc(self.in_region);
        let _ = self.sandbox.dealloc(self.out_region);
    }
}

/// One request/response round trip over the two scratch regions.
///
/// Free function so the borrow of the codec's scratch buffer (the request
/// slice) can coexist with the mutable borrow of the sandbox.
fn dispatch(
    sandbox: &mut Sandbox,
    call: GuestCall,
    in_region: i32,
    out_region: i32,
    capacity: u32,
    req: &[u8],
) -> Result<Vec<u8>> {
    let memory_size = sandbox.memory_size();
    let in_offset = in_region as usize;
    if in_offset + req.len() > memory_size {
        return Err(Error::LinearMemoryOverflow {
            offset: in_offset,
            len: req.len(),
            memory_size,
        });
    }
    sandbox.write_memory(in_offset, req)?;

    trace!(call = call.export_name(), req_len = req.len(), "guest call");
    let len = sandbox.call(call, in_region, req.len() as i32, out_region, capacity as i32)?;
    if len < 0 {
        return Err(Error::GuestFault(len));
    }
    let len = len as usize;
    if len > capacity as usize {
        return Err(Error::BufferTooSmall {
            need: len,
            have: capacity as usize,
        });
    }

    // The call may have grown memory; read_memory re-fetches the view.
    sandbox
        .read_memory(out_region as usize, len)
        .map_err(Error::from)
}
