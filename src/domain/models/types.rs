//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Core data types for the matching engine: sides, order lifecycle statuses, the caller-facing
// order request, the engine-side order state, and the trade record produced by each fill.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ENUMS              | Side and OrderStatus.                                            |
// | STRUCTS            | OrderRequest, Order and Trade.                                   |
// | TESTS              | Unit tests for the defined types.                                |
//
// Prices are integer ticks (price 5000 = $50.00 at a fixed 2-decimal scale) and quantities are
// integer units; all trade-value arithmetic stays in integers.
//--------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                 |
// |---------------|---------------------------------------------|
// | Side          | Represents the side of an order (Bid/Ask).  |
// | OrderStatus   | Lifecycle status of an order.               |
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// A buy order.
    Bid,
    /// A sell order.
    Ask,
}

impl Side {
    /// Returns the opposite side, i.e. the side an incoming order matches against.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }
}

/// Represents the lifecycle status of an order within the matching engine.
///
/// Transitions are one-directional:
/// `Submitted -> {Rejected}` or
/// `Submitted -> {Unfilled <-> PartiallyFilled} -> {Filled | Cancelled | PartiallyFilledCancelled}`,
/// with stop orders inserting `WaitingTrigger` before the normal chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    /// The order has been acknowledged by the engine but not yet matched.
    Submitted,
    /// A stop order waiting for its trigger price to be crossed.
    WaitingTrigger,
    /// The order rests in the book with no fills yet.
    Unfilled,
    /// The order has been partially filled.
    PartiallyFilled,
    /// The order has been completely filled.
    Filled,
    /// The order was cancelled (or discarded) before any fill.
    Cancelled,
    /// The order was partially filled and then cancelled (or discarded).
    PartiallyFilledCancelled,
    /// The order was rejected by the engine and never touched the book.
    Rejected,
}

impl OrderStatus {
    /// Returns true for states no further transition can leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Filled | Self::Cancelled | Self::PartiallyFilledCancelled | Self::Rejected
        )
    }
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                          |
// |---------------|------------------------------------------------------|
// | OrderRequest  | Caller-facing order configuration.                   |
// | Order         | Engine-side order state.                             |
// | Trade         | A completed trade between a maker and a taker.       |
//--------------------------------------------------------------------------------------------------

/// Caller-facing order configuration, constructed once per order before submission.
///
/// Defaults: no stop price, not all-or-none, not immediate-or-cancel. A `limit_price` of `None`
/// denotes a market order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// Caller-supplied identifier; must be unique among live orders.
    pub id: Uuid,
    /// Side of the order (Bid or Ask).
    pub side: Side,
    /// Total quantity to trade. Must be positive.
    pub quantity: u64,
    /// Limit price in ticks; `None` for a market order. A present price must be positive.
    pub limit_price: Option<i64>,
    /// Stop trigger price in ticks; `None` means not a stop order.
    pub stop_price: Option<i64>,
    /// All-or-none: fill the entire remaining quantity in one matching pass or not at all.
    pub all_or_none: bool,
    /// Immediate-or-cancel: discard any residual after the initial matching pass.
    pub immediate_or_cancel: bool,
}

impl OrderRequest {
    /// Creates a limit order request with default qualifiers.
    pub fn limit(id: Uuid, side: Side, quantity: u64, price: i64) -> Self {
        Self {
            id,
            side,
            quantity,
            limit_price: Some(price),
            stop_price: None,
            all_or_none: false,
            immediate_or_cancel: false,
        }
    }

    /// Creates a market order request with default qualifiers.
    pub fn market(id: Uuid, side: Side, quantity: u64) -> Self {
        Self {
            id,
            side,
            quantity,
            limit_price: None,
            stop_price: None,
            all_or_none: false,
            immediate_or_cancel: false,
        }
    }

    /// Parks the order until the last trade price crosses `stop_price`.
    pub fn with_stop_price(mut self, stop_price: i64) -> Self {
        self.stop_price = Some(stop_price);
        self
    }

    /// Marks the order all-or-none.
    pub fn with_all_or_none(mut self) -> Self {
        self.all_or_none = true;
        self
    }

    /// Marks the order immediate-or-cancel.
    pub fn with_immediate_or_cancel(mut self) -> Self {
        self.immediate_or_cancel = true;
        self
    }

    /// Returns true if this is a market order (no limit price).
    pub fn is_market(&self) -> bool {
        self.limit_price.is_none()
    }

    /// Fill-or-kill is the combination of all-or-none and immediate-or-cancel.
    pub fn fill_or_kill(&self) -> bool {
        self.all_or_none && self.immediate_or_cancel
    }
}

/// Engine-side order state: the identity fields of the request plus mutable quantity state,
/// lifecycle status and the arrival sequence used for time priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Caller-supplied identifier, unique among live orders.
    pub id: Uuid,
    /// Side of the order (Bid or Ask).
    pub side: Side,
    /// Limit price in ticks; `None` for a market order.
    pub limit_price: Option<i64>,
    /// Stop trigger price in ticks; `None` means not a stop order.
    pub stop_price: Option<i64>,
    /// All-or-none qualifier.
    pub all_or_none: bool,
    /// Immediate-or-cancel qualifier.
    pub immediate_or_cancel: bool,
    /// Original submitted quantity, adjusted only by replace.
    pub quantity: u64,
    /// Quantity still open to trade. Monotonically non-increasing between replaces.
    pub remaining: u64,
    /// Cumulative filled quantity.
    pub filled: u64,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Arrival sequence assigned by the engine; lower means earlier. A replace that moves the
    /// order to a new price assigns a fresh value.
    pub sequence_id: u64,
    /// Timestamp of order creation.
    pub created_at: DateTime<Utc>,
    /// Timestamp of the last state change.
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Builds the engine-side state for an accepted request.
    pub(crate) fn from_request(request: &OrderRequest, sequence_id: u64) -> Self {
        let now = Utc::now();
        Self {
            id: request.id,
            side: request.side,
            limit_price: request.limit_price,
            stop_price: request.stop_price,
            all_or_none: request.all_or_none,
            immediate_or_cancel: request.immediate_or_cancel,
            quantity: request.quantity,
            remaining: request.quantity,
            filled: 0,
            status: OrderStatus::Submitted,
            sequence_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns true if this is a market order (no limit price).
    pub fn is_market(&self) -> bool {
        self.limit_price.is_none()
    }

    /// Fill-or-kill is the combination of all-or-none and immediate-or-cancel.
    pub fn fill_or_kill(&self) -> bool {
        self.all_or_none && self.immediate_or_cancel
    }

    /// Applies a fill of `quantity` units, updating remaining/filled and the status.
    ///
    /// Callers guarantee `quantity <= self.remaining`.
    pub(crate) fn apply_fill(&mut self, quantity: u64) {
        self.remaining -= quantity;
        self.filled += quantity;
        self.status = if self.remaining == 0 {
            OrderStatus::Filled
        } else {
            OrderStatus::PartiallyFilled
        };
        self.updated_at = Utc::now();
    }
}

/// A completed trade between a resting (maker) order and an incoming (taker) order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Engine-issued identifier for the trade.
    pub id: Uuid,
    /// Identifier of the resting order.
    pub maker_order_id: Uuid,
    /// Identifier of the incoming order.
    pub taker_order_id: Uuid,
    /// Quantity traded.
    pub quantity: u64,
    /// Execution price in ticks; always the maker's price.
    pub price: i64,
    /// Trade value in quote ticks: `quantity * price`.
    pub quote_amount: u64,
    /// Timestamp when the trade occurred.
    pub created_at: DateTime<Utc>,
}

impl Trade {
    /// Records a fill of `quantity` at the maker's `price`.
    pub(crate) fn new(maker_order_id: Uuid, taker_order_id: Uuid, quantity: u64, price: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            maker_order_id,
            taker_order_id,
            quantity,
            price,
            quote_amount: quantity.saturating_mul(price as u64),
            created_at: Utc::now(),
        }
    }
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                           | Description                                          |
// |--------------------------------|------------------------------------------------------|
// | test_request_defaults          | Builder constructors and default qualifiers.         |
// | test_fill_or_kill_derivation   | FOK = AON and IOC combined.                          |
// | test_apply_fill_transitions    | Partial and full fill status transitions.            |
// | test_terminal_statuses         | is_terminal covers exactly the terminal states.      |
// | test_trade_value               | Quote amount stays in integer ticks.                 |
// | test_order_serialization       | Orders serialize for host consumption.               |
//--------------------------------------------------------------------------------------------------
