//! Order status state machine.
//!
//! `pending -> out_for_delivery -> delivered`. Managers may set any status; the
//! delivery crew only reports a delivered / not-delivered flag and can never move
//! an order backwards.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    OutForDelivery,
    Delivered,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::OutForDelivery => "out_for_delivery",
            OrderStatus::Delivered => "delivered",
        }
    }

    /// Accepts the canonical names plus `in_progress`, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(OrderStatus::Pending),
            "out_for_delivery" | "in_progress" => Some(OrderStatus::OutForDelivery),
            "delivered" => Some(OrderStatus::Delivered),
            _ => None,
        }
    }

    /// Decode a value read back from the `orders.status` column.
    pub fn from_stored(value: &str) -> AppResult<Self> {
        Self::parse(value).ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unknown order status in store: {value}"))
        })
    }

    pub fn from_flag(delivered: bool) -> Self {
        if delivered {
            OrderStatus::Delivered
        } else {
            OrderStatus::OutForDelivery
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Delivered)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as sent by clients: a JSON bool, a 0/1 number, or a string.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(untagged)]
pub enum StatusInput {
    Flag(bool),
    Number(i64),
    Text(String),
}

impl StatusInput {
    /// Boolean-like reading: `true`/`false`, `"true"`/`"false"`, `1`/`0`, `"1"`/`"0"`.
    pub fn as_flag(&self) -> Option<bool> {
        match self {
            StatusInput::Flag(flag) => Some(*flag),
            StatusInput::Number(1) => Some(true),
            StatusInput::Number(0) => Some(false),
            StatusInput::Number(_) => None,
            StatusInput::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Named status first, falling back to the flag reading.
    pub fn as_status(&self) -> Option<OrderStatus> {
        if let StatusInput::Text(text) = self {
            if let Some(status) = OrderStatus::parse(text) {
                return Some(status);
            }
        }
        self.as_flag().map(OrderStatus::from_flag)
    }
}

/// Status a manager asks for. Any valid value is accepted, including corrections backwards.
pub fn manager_transition(input: &StatusInput) -> AppResult<OrderStatus> {
    input
        .as_status()
        .ok_or_else(|| AppError::bad_request("Invalid status value"))
}

/// Status the assigned delivery crew reports. Only flags are understood and the
/// order may not leave the delivered state.
pub fn crew_transition(current: OrderStatus, input: &StatusInput) -> AppResult<OrderStatus> {
    let delivered = input
        .as_flag()
        .ok_or_else(|| AppError::bad_request("Invalid status value"))?;
    let next = OrderStatus::from_flag(delivered);
    if next < current {
        return Err(AppError::bad_request(format!("Order is already {current}")));
    }
    Ok(next)
}
