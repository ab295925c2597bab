//! Host-side data model for embedded simulation modules.
//!
//! Everything in this module is a plain value type: the host never holds
//! references into guest memory, so descriptions and value bundles are
//! decoded into owned structures that can be freely cloned out to callers.

use std::collections::HashMap;

/// Self-describing schema a module publishes once, immutable after load.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescription {
    pub model: ModelInfo,
    /// Suggested experiment setup; absent when the module does not ship one.
    pub experiment: Option<ExperimentInfo>,
    /// Declaration-ordered variable list.
    pub variables: Vec<ModelVariable>,
}

/// Identity and capability block of a model description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    pub generation_tool: String,
    pub generation_datetime: String,
    pub name_delimiter: String,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_handle_variable_step_size: bool,
    pub can_reset_step: bool,
    pub can_interpolate_inputs: bool,
}

/// Default experiment parameters suggested by the module.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentInfo {
    pub time_step_min: f64,
    pub time_step_max: f64,
    pub time_step_default: f64,
    pub start_time_default: f64,
    pub end_time_default: f64,
    pub time_unit: String,
}

/// One entry of the variable schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelVariable {
    /// Stable 32-bit id, unique within a module, assigned by the guest.
    pub id: i32,
    pub name: String,
    pub description: String,
    pub unit: String,
    pub value_type: VariableType,
    pub causality: Causality,
    /// Id of the variable this one is the time derivative of; 0 means none.
    pub derivative_of_id: i32,
    pub default: Option<VariableValue>,
}

/// Value type tag of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableType {
    Real,
    Int,
    Bool,
    String,
}

/// Role of a variable in the model interface.
///
/// Outputs and Locals are read by the host, Inputs and Parameters are
/// written by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Causality {
    Local,
    Parameter,
    Input,
    Output,
}

impl Causality {
    /// Whether the host may write this variable through `set_values`.
    pub fn is_writable(self) -> bool {
        matches!(self, Causality::Parameter | Causality::Input)
    }
}

/// A typed variable value.
#[derive(Debug, Clone, PartialEq)]
pub enum VariableValue {
    Real(f64),
    Int(i32),
    Bool(bool),
    String(String),
}

impl VariableValue {
    pub fn value_type(&self) -> VariableType {
        match self {
            VariableValue::Real(_) => VariableType::Real,
            VariableValue::Int(_) => VariableType::Int,
            VariableValue::Bool(_) => VariableType::Bool,
            VariableValue::String(_) => VariableType::String,
        }
    }
}

/// Variable-value bundle: four disjoint mappings keyed by variable id.
///
/// Each map is monomorphic in its value type; a variable id must appear in
/// at most one entry per bundle. Iteration order is not part of the wire
/// contract.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarValues {
    pub real_values: HashMap<i32, f64>,
    pub int_values: HashMap<i32, i32>,
    pub bool_values: HashMap<i32, bool>,
    pub string_values: HashMap<i32, String>,
}

impl VarValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of values across all four sections.
    pub fn len(&self) -> usize {
        self.real_values.len()
            + self.int_values.len()
            + self.bool_values.len()
            + self.string_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Guest status reported in every response message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warning,
    Discard,
    Error,
    Fatal,
}

impl Status {
    /// Whether the reported status leaves the runtime usable.
    pub fn is_fatal(self) -> bool {
        matches!(self, Status::Fatal)
    }
}

/// Verbosity limit handed to the guest at `initialize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

/// Response to a `get_values` call.
#[derive(Debug, Clone, PartialEq)]
pub struct GetValuesResponse {
    pub status: Status,
    /// The guest's internal clock at the time of the call.
    pub current_time: f64,
    /// Requested values; empty when the guest reported a non-OK status
    /// without a value bundle.
    pub values: VarValues,
}

/// Response to a `do_step` call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoStepResponse {
    pub status: Status,
    /// The guest clock after the step, `t + dt` on success.
    pub updated_time: f64,
}
