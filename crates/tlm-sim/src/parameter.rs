//! Typed, named component parameters.
//!
//! Components register their parameters during `configure` and read them
//! back by name in `initialize`; the kernel validates every assignment
//! against the registered type and range.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl ParameterValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "integer",
            ParameterValue::Real(_) => "real",
            ParameterValue::Text(_) => "text",
        }
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{v}"),
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Real(v) => write!(f, "{v}"),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

impl From<f64> for ParameterValue {
    fn from(v: f64) -> Self {
        ParameterValue::Real(v)
    }
}

impl From<i64> for ParameterValue {
    fn from(v: i64) -> Self {
        ParameterValue::Int(v)
    }
}

impl From<bool> for ParameterValue {
    fn from(v: bool) -> Self {
        ParameterValue::Bool(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

/// A registered parameter with its default and current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    description: String,
    unit: String,
    default: ParameterValue,
    value: ParameterValue,
    /// Inclusive bounds for `Real` and `Int` values.
    range: Option<(f64, f64)>,
}

impl Parameter {
    fn new(name: &str, default: ParameterValue) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            unit: String::new(),
            value: default.clone(),
            default,
            range: None,
        }
    }

    pub fn real(name: &str, default: f64) -> Self {
        Self::new(name, ParameterValue::Real(default))
    }

    pub fn int(name: &str, default: i64) -> Self {
        Self::new(name, ParameterValue::Int(default))
    }

    pub fn boolean(name: &str, default: bool) -> Self {
        Self::new(name, ParameterValue::Bool(default))
    }

    pub fn text(name: &str, default: &str) -> Self {
        Self::new(name, ParameterValue::Text(default.to_string()))
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn unit(mut self, unit: &str) -> Self {
        self.unit = unit.to_string();
        self
    }

    pub fn range(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description_text(&self) -> &str {
        &self.description
    }

    pub fn unit_text(&self) -> &str {
        &self.unit
    }

    pub fn default_value(&self) -> &ParameterValue {
        &self.default
    }

    pub fn value(&self) -> &ParameterValue {
        &self.value
    }

    pub fn bounds(&self) -> Option<(f64, f64)> {
        self.range
    }

    fn check(&self, value: &ParameterValue) -> SimResult<()> {
        if std::mem::discriminant(value) != std::mem::discriminant(&self.default) {
            return Err(SimError::ParameterType {
                name: self.name.clone(),
                expected: self.default.type_name(),
                got: value.type_name(),
            });
        }
        let numeric = match value {
            ParameterValue::Real(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f64),
            _ => None,
        };
        if let Some(v) = numeric {
            if !v.is_finite() {
                return Err(SimError::OutOfRange {
                    name: self.name.clone(),
                    value: v,
                    min: f64::NEG_INFINITY,
                    max: f64::INFINITY,
                });
            }
            if let Some((min, max)) = self.range
                && !(min..=max).contains(&v)
            {
                return Err(SimError::OutOfRange {
                    name: self.name.clone(),
                    value: v,
                    min,
                    max,
                });
            }
        }
        Ok(())
    }

    fn parse(&self, text: &str) -> SimResult<ParameterValue> {
        let fail = || SimError::ParseParameter {
            name: self.name.clone(),
            value: text.to_string(),
        };
        let t = text.trim();
        Ok(match self.default {
            ParameterValue::Real(_) => ParameterValue::Real(t.parse().map_err(|_| fail())?),
            ParameterValue::Int(_) => ParameterValue::Int(t.parse().map_err(|_| fail())?),
            ParameterValue::Bool(_) => match t {
                "true" | "1" => ParameterValue::Bool(true),
                "false" | "0" => ParameterValue::Bool(false),
                _ => return Err(fail()),
            },
            ParameterValue::Text(_) => ParameterValue::Text(text.to_string()),
        })
    }
}

/// The parameters of one component, in registration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterSet {
    params: Vec<Parameter>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parameter: Parameter) -> SimResult<()> {
        if self.get(&parameter.name).is_some() {
            return Err(SimError::DuplicateParameter {
                name: parameter.name,
            });
        }
        parameter.check(&parameter.default)?;
        self.params.push(parameter);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    fn get_mut(&mut self, name: &str) -> SimResult<&mut Parameter> {
        self.params
            .iter_mut()
            .find(|p| p.name == name)
            .ok_or_else(|| SimError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn clear(&mut self) {
        self.params.clear();
    }

    /// Assign a value; the set is unchanged on error.
    pub fn set(&mut self, name: &str, value: impl Into<ParameterValue>) -> SimResult<()> {
        let value = value.into();
        let p = self.get_mut(name)?;
        p.check(&value)?;
        p.value = value;
        Ok(())
    }

    /// Parse `text` according to the parameter's type and assign it.
    pub fn set_from_str(&mut self, name: &str, text: &str) -> SimResult<()> {
        let p = self.get_mut(name)?;
        let value = p.parse(text)?;
        p.check(&value)?;
        p.value = value;
        Ok(())
    }

    pub fn reset_to_defaults(&mut self) {
        for p in &mut self.params {
            p.value = p.default.clone();
        }
    }

    pub fn value(&self, name: &str) -> SimResult<&ParameterValue> {
        self.get(name)
            .map(|p| &p.value)
            .ok_or_else(|| SimError::UnknownParameter {
                name: name.to_string(),
            })
    }

    pub fn real(&self, name: &str) -> SimResult<f64> {
        match self.value(name)? {
            ParameterValue::Real(v) => Ok(*v),
            other => Err(self.type_error(name, "real", other)),
        }
    }

    pub fn int(&self, name: &str) -> SimResult<i64> {
        match self.value(name)? {
            ParameterValue::Int(v) => Ok(*v),
            other => Err(self.type_error(name, "integer", other)),
        }
    }

    pub fn boolean(&self, name: &str) -> SimResult<bool> {
        match self.value(name)? {
            ParameterValue::Bool(v) => Ok(*v),
            other => Err(self.type_error(name, "bool", other)),
        }
    }

    pub fn text(&self, name: &str) -> SimResult<&str> {
        match self.value(name)? {
            ParameterValue::Text(v) => Ok(v),
            other => Err(self.type_error(name, "text", other)),
        }
    }

    fn type_error(&self, name: &str, expected: &'static str, got: &ParameterValue) -> SimError {
        SimError::ParameterType {
            name: name.to_string(),
            expected,
            got: got.type_name(),
        }
    }
}
