//! Request parsing and response shapes

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{InferenceError, Result};

/// A single price query
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionRequest {
    /// Informational only
    pub crop: Option<String>,
    /// Informational only
    pub location: Option<String>,
    pub current_price: f64,
    /// Percent change; `None` behaves as 0
    pub change: Option<f64>,
}

impl PredictionRequest {
    pub fn new(current_price: f64, change: Option<f64>) -> Self {
        Self {
            crop: None,
            location: None,
            current_price,
            change,
        }
    }

    /// Parse a raw JSON payload
    pub fn from_json(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|e| InferenceError::InvalidInput(format!("malformed JSON: {e}")))?;
        Self::from_value(&value)
    }

    /// Validate a decoded payload.
    ///
    /// `currentPrice` must be numeric (or a numeric string) when present and
    /// defaults to 0. A malformed `change` is dropped with a warning.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| InferenceError::InvalidInput("payload must be a JSON object".into()))?;

        let current_price = match object.get("currentPrice") {
            None | Some(Value::Null) => 0.0,
            Some(raw) => numeric(raw).ok_or_else(|| {
                InferenceError::InvalidInput(format!("currentPrice must be a number, got {raw}"))
            })?,
        };

        let change = match object.get("change") {
            None | Some(Value::Null) => None,
            Some(raw) => {
                let parsed = numeric(raw);
                if parsed.is_none() {
                    warn!(change = %raw, "ignoring malformed change");
                }
                parsed
            }
        };

        let text = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_owned);

        Ok(Self {
            crop: text("crop"),
            location: text("location"),
            current_price,
            change,
        })
    }

    /// Percent change with the absent case resolved to 0
    pub fn change_or_zero(&self) -> f64 {
        self.change.unwrap_or(0.0)
    }
}

fn numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Which strategy produced a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTag {
    Xgboost,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionResponse {
    Prediction {
        #[serde(rename = "predictedPrice")]
        predicted_price: i64,
        model: ModelTag,
        /// Present only when a broken model forced the fallback
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    Error {
        error: String,
        details: String,
    },
}

/// Response status, also used as the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success = 0,
    InvalidInput = 1,
    ModelFailure = 2,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionOutcome {
    pub response: PredictionResponse,
    pub status: Status,
}

impl PredictionOutcome {
    pub fn invalid(details: impl Into<String>) -> Self {
        Self {
            response: PredictionResponse::Error {
                error: "Invalid input".to_string(),
                details: details.into(),
            },
            status: Status::InvalidInput,
        }
    }

    /// Predicted price, if this is not an error response
    pub fn predicted_price(&self) -> Option<i64> {
        match &self.response {
            PredictionResponse::Prediction { predicted_price, .. } => Some(*predicted_price),
            PredictionResponse::Error { .. } => None,
        }
    }

    pub fn model(&self) -> Option<ModelTag> {
        match &self.response {
            PredictionResponse::Prediction { model, .. } => Some(*model),
            PredictionResponse::Error { .. } => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_value(&self.response)
            .map(|v| v.to_string())
            .unwrap_or_else(|_| {
                r#"{"error":"Internal error","details":"response serialization failed"}"#
                    .to_string()
            })
    }
}
