//! Query-driven arithmetic under the dynamic prefix.

use http::StatusCode;
use thiserror::Error;

use crate::http::{QueryParams, Response};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    #[error("missing parameter {0}")]
    Missing(&'static str),

    #[error("parameter {name} is not a number: {value:?}")]
    NotANumber { name: &'static str, value: String },
}

fn operand(query: &QueryParams, name: &'static str) -> Result<f64, ArithmeticError> {
    let value = query.get(name).ok_or(ArithmeticError::Missing(name))?;
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| ArithmeticError::NotANumber {
            name,
            value: value.clone(),
        })
}

/// Sum of the `a1` and `a2` query parameters.
pub fn evaluate(query: &QueryParams) -> Result<f64, ArithmeticError> {
    Ok(operand(query, "a1")? + operand(query, "a2")?)
}

/// `3.0`, not `3`.
pub fn format_result(value: f64) -> String {
    format!("{value:?}")
}

pub fn handle(query: &QueryParams) -> Response {
    match evaluate(query) {
        Ok(sum) => {
            tracing::info!(result = sum, "Arithmetic result");
            Response::text(StatusCode::OK, format_result(sum))
        }
        Err(e) => {
            tracing::info!(error = %e, "Arithmetic request rejected");
            Response::bad_request(e.to_string())
        }
    }
}
