//! Runtime value types

use super::errors::{EffectError, ErrorInfo, TYPE_ERROR};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Value carried between steps of an effect
///
/// Every node produces one of these. Continuations receive it and decide
/// what to run next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum Val {
    Null,
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<Val>),
    Obj(HashMap<String, Val>),
    /// A failure reified as a value (see `Effect::attempt`)
    Error(ErrorInfo),
}

impl Val {
    /// Numeric view of the value, if it is a number
    pub fn as_num(&self) -> Option<f64> {
        match self {
            Val::Num(n) => Some(*n),
            _ => None,
        }
    }

    /// The number inside, or a `TypeError` failure naming what was found
    pub fn expect_num(&self) -> Result<f64, EffectError> {
        self.as_num().ok_or_else(|| {
            EffectError::raised(
                TYPE_ERROR,
                format!("expected number, got {}", self.type_name()),
            )
        })
    }

    /// Name of the variant, used in type errors
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Null => "null",
            Val::Bool(_) => "bool",
            Val::Num(_) => "number",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Obj(_) => "object",
            Val::Error(_) => "error",
        }
    }
}

impl From<f64> for Val {
    fn from(n: f64) -> Self {
        Val::Num(n)
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Bool(b)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::Str(s.to_string())
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::Str(s)
    }
}
