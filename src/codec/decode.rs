//! Response and description decoders.
//!
//! Decoders are stateless: they borrow the response slice the runtime cut
//! out of guest memory and produce owned host values. Every length and
//! enum tag is checked; a malformed buffer yields a [`CodecError`], never
//! a panic.

use crate::model::{
    Capabilities, Causality, DoStepResponse, ExperimentInfo, GetValuesResponse, ModelDescription,
    ModelInfo, ModelVariable, Status, VarValues, VariableType, VariableValue,
};

use super::reader::MessageReader;
use super::{CodecError, DESCRIPTION_MAGIC, DESCRIPTION_VERSION};

fn status_from_wire(value: u32) -> Result<Status, CodecError> {
    match value {
        0 => Ok(Status::Ok),
        1 => Ok(Status::Warning),
        2 => Ok(Status::Discard),
        3 => Ok(Status::Error),
        4 => Ok(Status::Fatal),
        other => Err(CodecError::UnknownStatus(other)),
    }
}

fn value_type_from_wire(variable: i32, value: u32) -> Result<VariableType, CodecError> {
    match value {
        0 => Ok(VariableType::Real),
        1 => Ok(VariableType::Int),
        2 => Ok(VariableType::Bool),
        3 => Ok(VariableType::String),
        other => Err(CodecError::UnknownValueType {
            variable,
            value: other,
        }),
    }
}

fn causality_from_wire(variable: i32, value: u32) -> Result<Causality, CodecError> {
    match value {
        0 => Ok(Causality::Local),
        1 => Ok(Causality::Parameter),
        2 => Ok(Causality::Input),
        3 => Ok(Causality::Output),
        other => Err(CodecError::UnknownCausality {
            variable,
            value: other,
        }),
    }
}

/// Decode a variable-value bundle, rejecting duplicate ids across all four
/// sections.
pub(crate) fn read_var_values(r: &mut MessageReader<'_>) -> Result<VarValues, CodecError> {
    let mut values = VarValues::new();
    let mut seen = std::collections::HashSet::new();

    let n_real = r.u32()?;
    for _ in 0..n_real {
        let id = r.i32()?;
        let val = r.f64()?;
        if !seen.insert(id) {
            return Err(CodecError::DuplicateVariableId(id));
        }
        values.real_values.insert(id, val);
    }

    let n_int = r.u32()?;
    for _ in 0..n_int {
        let id = r.i32()?;
        let val = r.i32()?;
        if !seen.insert(id) {
            return Err(CodecError::DuplicateVariableId(id));
        }
        values.int_values.insert(id, val);
    }

    let n_bool = r.u32()?;
    for _ in 0..n_bool {
        let id = r.i32()?;
        let val = r.bool()?;
        if !seen.insert(id) {
            return Err(CodecError::DuplicateVariableId(id));
        }
        values.bool_values.insert(id, val);
    }

    let n_string = r.u32()?;
    for _ in 0..n_string {
        let id = r.i32()?;
        let val = r.string()?;
        if !seen.insert(id) {
            return Err(CodecError::DuplicateVariableId(id));
        }
        values.string_values.insert(id, val);
    }

    Ok(values)
}

/// Decode a bare variable-value bundle (the `setValues` request payload).
///
/// The runtime itself only decodes bundles embedded in responses; this
/// entry point serves guest-side tooling and round-trip tests.
pub fn var_values(bytes: &[u8]) -> Result<VarValues, CodecError> {
    let mut r = MessageReader::new(bytes);
    read_var_values(&mut r)
}

/// Decode a bare status response.
pub fn status_res(bytes: &[u8]) -> Result<Status, CodecError> {
    let mut r = MessageReader::new(bytes);
    status_from_wire(r.u32()?)
}

/// Decode a `do_step` response.
pub fn do_step_res(bytes: &[u8]) -> Result<DoStepResponse, CodecError> {
    let mut r = MessageReader::new(bytes);
    let status = status_from_wire(r.u32()?)?;
    let updated_time = r.f64()?;
    Ok(DoStepResponse {
        status,
        updated_time,
    })
}

/// Decode a `get_values` response; the bundle is optional on the wire.
pub fn get_values_res(bytes: &[u8]) -> Result<GetValuesResponse, CodecError> {
    let mut r = MessageReader::new(bytes);
    let status = status_from_wire(r.u32()?)?;
    let current_time = r.f64()?;
    let values = if r.bool()? {
        read_var_values(&mut r)?
    } else {
        VarValues::new()
    };
    Ok(GetValuesResponse {
        status,
        current_time,
        values,
    })
}

fn read_variable(r: &mut MessageReader<'_>) -> Result<ModelVariable, CodecError> {
    let id = r.i32()?;
    let name = r.string()?;
    let description = r.string()?;
    let unit = r.string()?;
    let value_type = value_type_from_wire(id, r.u32()?)?;
    let causality = causality_from_wire(id, r.u32()?)?;
    let derivative_of_id = r.i32()?;
    let default = if r.bool()? {
        Some(match value_type {
            VariableType::Real => VariableValue::Real(r.f64()?),
            VariableType::Int => VariableValue::Int(r.i32()?),
            VariableType::Bool => VariableValue::Bool(r.bool()?),
            VariableType::String => VariableValue::String(r.string()?),
        })
    } else {
        None
    };
    Ok(ModelVariable {
        id,
        name,
        description,
        unit,
        value_type,
        causality,
        derivative_of_id,
        default,
    })
}

/// Decode and verify a model description blob.
///
/// The signature (magic + schema version) is checked before anything else;
/// a blob with the wrong signature is rejected without further parsing.
pub fn model_description(bytes: &[u8]) -> Result<ModelDescription, CodecError> {
    let mut r = MessageReader::new(bytes);

    let magic = r.u32()?;
    if magic != DESCRIPTION_MAGIC {
        return Err(CodecError::BadSignature { magic });
    }
    let version = r.u16()?;
    if version != DESCRIPTION_VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }

    let id = r.string()?;
    let name = r.string()?;
    let description = r.string()?;
    let generation_tool = r.string()?;
    let generation_datetime = r.string()?;
    let name_delimiter = r.string()?;
    let capabilities = Capabilities {
        can_handle_variable_step_size: r.bool()?,
        can_reset_step: r.bool()?,
        can_interpolate_inputs: r.bool()?,
    };

    let experiment = if r.bool()? {
        Some(ExperimentInfo {
            time_step_min: r.f64()?,
            time_step_max: r.f64()?,
            time_step_default: r.f64()?,
            start_time_default: r.f64()?,
            end_time_default: r.f64()?,
            time_unit: r.string()?,
        })
    } else {
        None
    };

    let n_vars = r.u32()?;
    // Cap the preallocation; a hostile count fails on the first read anyway.
    let mut variables = Vec::with_capacity((n_vars as usize).min(1024));
    for _ in 0..n_vars {
        variables.push(read_variable(&mut r)?);
    }

    Ok(ModelDescription {
        model: ModelInfo {
            id,
            name,
            description,
            generation_tool,
            generation_datetime,
            name_delimiter,
            capabilities,
        },
        experiment,
        variables,
    })
}
