use super::state::DoneReason;
use crate::core::{OrderId, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One public mutating call, as recorded in `user_actions.jsonl`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAction {
    pub action_id: u64,
    /// Session cursor when the call was made
    pub cursor: u64,
    #[serde(flatten)]
    pub action: Action,
    pub accepted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Step {
        requested: u64,
        advanced: u64,
    },
    SubmitOrder {
        asset_id: String,
        side: Side,
        limit_price: Decimal,
        size: Decimal,
        order_id: Option<OrderId>,
        /// Filled at submission
        filled: Decimal,
    },
    CancelOrder {
        order_id: OrderId,
        cancelled: bool,
    },
    SaveArtifacts {
        dir: String,
    },
    Finish {
        reason: DoneReason,
    },
}

/// One point of the equity curve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub cursor: u64,
    pub seq: u64,
    pub ts: u64,
    pub cash: Decimal,
    pub equity: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
}
