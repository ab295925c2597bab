//! Request and description encoders.
//!
//! Encoders append to a caller-provided [`MessageWriter`]; the [`Codec`]
//! front end owns the scratch writer and hands out the finished slices.
//!
//! [`Codec`]: super::Codec

use crate::model::{
    Causality, LogLevel, ModelDescription, ModelVariable, VarValues, VariableType, VariableValue,
};

use super::writer::MessageWriter;
use super::{DESCRIPTION_MAGIC, DESCRIPTION_VERSION};

pub(crate) fn log_level_wire(level: LogLevel) -> u32 {
    match level {
        LogLevel::Info => 0,
        LogLevel::Warn => 1,
        LogLevel::Error => 2,
    }
}

pub(crate) fn value_type_wire(ty: VariableType) -> u32 {
    match ty {
        VariableType::Real => 0,
        VariableType::Int => 1,
        VariableType::Bool => 2,
        VariableType::String => 3,
    }
}

pub(crate) fn causality_wire(causality: Causality) -> u32 {
    match causality {
        Causality::Local => 0,
        Causality::Parameter => 1,
        Causality::Input => 2,
        Causality::Output => 3,
    }
}

/// Append a variable-value bundle: four counted sections, reals first.
pub(crate) fn put_var_values(w: &mut MessageWriter, values: &VarValues) {
    w.put_u32(values.real_values.len() as u32);
    for (id, val) in &values.real_values {
        w.put_i32(*id);
        w.put_f64(*val);
    }
    w.put_u32(values.int_values.len() as u32);
    for (id, val) in &values.int_values {
        w.put_i32(*id);
        w.put_i32(*val);
    }
    w.put_u32(values.bool_values.len() as u32);
    for (id, val) in &values.bool_values {
        w.put_i32(*id);
        w.put_bool(*val);
    }
    w.put_u32(values.string_values.len() as u32);
    for (id, val) in &values.string_values {
        w.put_i32(*id);
        w.put_string(val);
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn put_init_req(
    w: &mut MessageWriter,
    model_id: &str,
    start_time: f64,
    end_time: Option<f64>,
    tolerance: Option<f64>,
    log_level: LogLevel,
    check: bool,
    initial_values: &VarValues,
) {
    w.put_string(model_id);
    w.put_f64(start_time);
    w.put_bool(end_time.is_some());
    w.put_f64(end_time.unwrap_or(0.0));
    w.put_bool(tolerance.is_some());
    w.put_f64(tolerance.unwrap_or(0.0));
    w.put_u32(log_level_wire(log_level));
    w.put_bool(check);
    put_var_values(w, initial_values);
}

pub(crate) fn put_set_values_req(w: &mut MessageWriter, values: &VarValues) {
    put_var_values(w, values);
}

pub(crate) fn put_get_values_req(w: &mut MessageWriter, ids: &[i32]) {
    w.put_u32(ids.len() as u32);
    for id in ids {
        w.put_i32(*id);
    }
}

pub(crate) fn put_do_step_req(w: &mut MessageWriter, current_time: f64, timestep: f64) {
    w.put_f64(current_time);
    w.put_f64(timestep);
}

pub(crate) fn put_reset_step_req(w: &mut MessageWriter, time: f64) {
    w.put_f64(time);
}

fn put_variable(w: &mut MessageWriter, var: &ModelVariable) {
    w.put_i32(var.id);
    w.put_string(&var.name);
    w.put_string(&var.description);
    w.put_string(&var.unit);
    w.put_u32(value_type_wire(var.value_type));
    w.put_u32(causality_wire(var.causality));
    w.put_i32(var.derivative_of_id);
    w.put_bool(var.default.is_some());
    if let Some(default) = &var.default {
        match default {
            VariableValue::Real(v) => w.put_f64(*v),
            VariableValue::Int(v) => w.put_i32(*v),
            VariableValue::Bool(v) => w.put_bool(*v),
            VariableValue::String(v) => w.put_string(v),
        }
    }
}

/// Encode a full model description, signature first.
///
/// The host normally only decodes descriptions; the encoder exists so the
/// schema round-trips and so module tooling and tests can produce
/// description blobs with the same layout guests emit.
pub(crate) fn put_model_description(w: &mut MessageWriter, md: &ModelDescription) {
    w.put_u32(DESCRIPTION_MAGIC);
    w.put_u16(DESCRIPTION_VERSION);

    w.put_string(&md.model.id);
    w.put_string(&md.model.name);
    w.put_string(&md.model.description);
    w.put_string(&md.model.generation_tool);
    w.put_string(&md.model.generation_datetime);
    w.put_string(&md.model.name_delimiter);
    w.put_bool(md.model.capabilities.can_handle_variable_step_size);
    w.put_bool(md.model.capabilities.can_reset_step);
    w.put_bool(md.model.capabilities.can_interpolate_inputs);

    w.put_bool(md.experiment.is_some());
    if let Some(exp) = &md.experiment {
        w.put_f64(exp.time_step_min);
        w.put_f64(exp.time_step_max);
        w.put_f64(exp.time_step_default);
        w.put_f64(exp.start_time_default);
        w.put_f64(exp.end_time_default);
        w.put_string(&exp.time_unit);
    }

    w.put_u32(md.variables.len() as u32);
    for var in &md.variables {
        put_variable(w, var);
    }
}
