//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The core matching engine for one instrument: accepts incoming orders, matches them against the
// opposite book side in price-time priority, rests residuals, and drives the cancel/replace and
// stop-trigger paths. Every lifecycle transition is reported synchronously through the injected
// OrderListener; the accept for a submission always precedes the fills it generates.
//
// | Component       | Description                                                    |
// |-----------------|----------------------------------------------------------------|
// | MatchingEngine  | Engine state: both book sides, pending stops, last trade price |
// | MatchResult     | Outcome of submit/replace: order snapshot plus trades          |
// | EngineError     | Validation, cancel and replace rejects                         |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                      | Description                                  | Return Type       |
// |---------------------------|----------------------------------------------|-------------------|
// | submit                    | Process a new order                          | Result<MatchResult>|
// | cancel                    | Cancel a resting or trigger-pending order    | Result<Order>     |
// | replace                   | Modify a resting order's quantity/price      | Result<MatchResult>|
// | best_bid / best_ask       | Best prices                                  | Option<i64>       |
// | spread / last_trade_price | Book statistics                              | Option<i64>       |
//--------------------------------------------------------------------------------------------------

use chrono::Utc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::domain::models::types::{Order, OrderRequest, OrderStatus, Side, Trade};
use crate::domain::services::events::OrderListener;
use crate::domain::services::orderbook::{BookError, BookSide};

/// Errors surfaced by engine operations. Every variant is local, synchronous and non-fatal: a
/// rejected operation never mutates book state and the engine remains usable afterwards.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The order was malformed and never touched the book.
    #[error("order {order_id} rejected: {reason}")]
    ValidationReject { order_id: Uuid, reason: String },

    /// The cancel target is unknown or already terminal.
    #[error("cancel of order {order_id} rejected: {reason}")]
    CancelReject { order_id: Uuid, reason: String },

    /// The replace target is unknown, terminal, or the resulting state would be invalid.
    #[error("replace of order {order_id} rejected: {reason}")]
    ReplaceReject { order_id: Uuid, reason: String },

    /// Internal bookkeeping failure; indicates a bug rather than bad input.
    #[error(transparent)]
    Book(#[from] BookError),
}

/// Type alias for Result with EngineError.
pub type EngineResult<T> = Result<T, EngineError>;

/// Outcome of a submit or replace: the processed order's final snapshot and the trades the
/// operation generated, including any produced by stop orders it triggered.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// The order after processing.
    pub order: Order,
    /// Trades generated, in execution order.
    pub trades: Vec<Trade>,
}

/// A single-instrument continuous double-auction matching engine.
///
/// # Price-time priority
///
/// Better prices match first (higher bids, lower asks); at one price, earlier arrivals match
/// first (FIFO). The trade price is always the resting order's price, so an aggressive taker
/// receives price improvement.
///
/// # Order qualifiers
///
/// * **AON** — evaluated atomically: the opposite side's liquidity across all acceptable price
///   levels must cover the full remaining quantity before any fill is committed.
/// * **IOC** — any residual after the initial matching pass is discarded, never rested.
/// * **Stop** — parked until the last trade price crosses the trigger, then injected as a live
///   limit or market order.
///
/// # Concurrency
///
/// The engine is a plain single-threaded value; `submit`, `cancel` and `replace` run
/// synchronously to completion in call order. Serving several instruments means several
/// independent engines.
#[derive(Debug)]
pub struct MatchingEngine<L: OrderListener> {
    /// Resting buy orders.
    bids: BookSide,
    /// Resting sell orders.
    asks: BookSide,
    /// Stop orders waiting for their trigger, in arrival order.
    pending_stops: Vec<Order>,
    /// Price of the most recent fill; drives stop activation.
    last_trade_price: Option<i64>,
    /// Arrival sequence counter for time priority.
    next_sequence_id: u64,
    /// The injected event sink.
    listener: L,
}

impl<L: OrderListener> MatchingEngine<L> {
    /// Creates an empty engine delivering events to `listener`.
    pub fn new(listener: L) -> Self {
        Self {
            bids: BookSide::new(Side::Bid),
            asks: BookSide::new(Side::Ask),
            pending_stops: Vec::new(),
            last_trade_price: None,
            next_sequence_id: 1,
            listener,
        }
    }

    /// Processes a new order.
    ///
    /// Emits exactly one accept-or-reject event, then zero or more fill events. Residual
    /// quantity rests in the own side unless the order is IOC or a market order, in which case
    /// it is discarded — reported as a normal accept with partial or no fill, not a reject.
    /// A stop order whose trigger has not been crossed is parked and accepted without matching.
    ///
    /// # Errors
    /// `EngineError::ValidationReject` for a non-positive quantity, a non-positive limit or
    /// stop price, or an id that collides with a live order. The book is never touched on
    /// rejection.
    pub fn submit(&mut self, request: OrderRequest) -> EngineResult<MatchResult> {
        if let Err(reason) = self.validate(&request) {
            let mut order = Order::from_request(&request, 0);
            order.status = OrderStatus::Rejected;
            debug!(order_id = %request.id, reason, "submit rejected");
            self.listener.on_reject(&order, &reason);
            return Err(EngineError::ValidationReject { order_id: request.id, reason });
        }

        let sequence_id = self.next_sequence();
        let mut order = Order::from_request(&request, sequence_id);

        if let Some(stop_price) = order.stop_price {
            if !self.stop_triggered(order.side, stop_price) {
                order.status = OrderStatus::WaitingTrigger;
                debug!(order_id = %order.id, stop_price, "stop order parked");
                self.listener.on_accept(&order);
                self.pending_stops.push(order.clone());
                return Ok(MatchResult { order, trades: Vec::new() });
            }
        }

        self.listener.on_accept(&order);
        let mut trades = Vec::new();
        let order = self.execute(order, &mut trades)?;
        self.activate_triggered_stops(&mut trades)?;
        Ok(MatchResult { order, trades })
    }

    /// Cancels a resting order, or a stop order that has not yet triggered.
    ///
    /// # Errors
    /// `EngineError::CancelReject` when the order is unknown, already filled, or already
    /// cancelled; no state is mutated on failure.
    pub fn cancel(&mut self, order_id: Uuid) -> EngineResult<Order> {
        if let Some(side) = self.resting_side(order_id) {
            let book = self.side_mut(side);
            let mut order = book.remove(order_id)?;
            order.status = if order.filled == 0 {
                OrderStatus::Cancelled
            } else {
                OrderStatus::PartiallyFilledCancelled
            };
            order.updated_at = Utc::now();
            debug!(order_id = %order.id, remaining = order.remaining, "order cancelled");
            self.listener.on_cancel(&order);
            return Ok(order);
        }

        if let Some(position) = self.pending_stops.iter().position(|o| o.id == order_id) {
            let mut order = self.pending_stops.remove(position);
            order.status = OrderStatus::Cancelled;
            order.updated_at = Utc::now();
            debug!(order_id = %order.id, "pending stop cancelled");
            self.listener.on_cancel(&order);
            return Ok(order);
        }

        let reason = "order unknown, already filled, or already cancelled".to_string();
        self.listener.on_cancel_reject(order_id, &reason);
        Err(EngineError::CancelReject { order_id, reason })
    }

    /// Modifies a resting order. Quantity changes by `quantity_delta`; `new_price: None` leaves
    /// the price unchanged.
    ///
    /// A quantity-only change is applied in place and the order keeps its queue position. A
    /// price change relocates the order: it receives a fresh arrival sequence (time priority
    /// resets behind all orders at the new level) and is resubmitted through the matching path,
    /// so a replace that crosses the spread trades immediately. The replace event is emitted
    /// before any matching it triggers.
    ///
    /// # Errors
    /// `EngineError::ReplaceReject` when the order is not resting, the reduction would leave no
    /// open quantity, or the new price is invalid; no state is mutated on failure.
    pub fn replace(
        &mut self,
        order_id: Uuid,
        quantity_delta: i64,
        new_price: Option<i64>,
    ) -> EngineResult<MatchResult> {
        let Some(side) = self.resting_side(order_id) else {
            return Err(self.reject_replace(order_id, "order unknown or not resting"));
        };

        let (current_price, remaining) = {
            let book = self.side_ref(side);
            let order = book.get(order_id).ok_or(BookError::OrderNotFound(order_id))?;
            let price = order.limit_price.ok_or(BookError::NoLimitPrice)?;
            (price, order.remaining)
        };

        if quantity_delta < 0 && quantity_delta.unsigned_abs() >= remaining {
            return Err(self.reject_replace(order_id, "size reduction would leave no open quantity"));
        }
        if let Some(price) = new_price {
            if price <= 0 {
                return Err(self.reject_replace(order_id, "invalid price"));
            }
        }

        let effective_price = new_price.unwrap_or(current_price);

        if effective_price == current_price {
            // Same level: mutate in place, queue position retained.
            let order = self.side_mut(side).adjust_quantity(order_id, quantity_delta)?;
            debug!(order_id = %order.id, quantity_delta, "order size replaced in place");
            self.listener.on_replace(&order, quantity_delta, effective_price);
            return Ok(MatchResult { order, trades: Vec::new() });
        }

        let mut order = self.side_mut(side).remove(order_id)?;
        if quantity_delta >= 0 {
            order.quantity = order.quantity.saturating_add(quantity_delta as u64);
            order.remaining = order.remaining.saturating_add(quantity_delta as u64);
        } else {
            order.quantity = order.quantity.saturating_sub(quantity_delta.unsigned_abs());
            order.remaining = order.remaining.saturating_sub(quantity_delta.unsigned_abs());
        }
        order.limit_price = Some(effective_price);
        order.sequence_id = self.next_sequence();
        order.updated_at = Utc::now();
        debug!(order_id = %order.id, quantity_delta, effective_price, "order re-priced");
        self.listener.on_replace(&order, quantity_delta, effective_price);

        let mut trades = Vec::new();
        let order = self.execute(order, &mut trades)?;
        self.activate_triggered_stops(&mut trades)?;
        Ok(MatchResult { order, trades })
    }

    /// Best bid price, if any bids rest.
    pub fn best_bid(&self) -> Option<i64> {
        self.bids.best_price().ok()
    }

    /// Best ask price, if any asks rest.
    pub fn best_ask(&self) -> Option<i64> {
        self.asks.best_price().ok()
    }

    /// Difference between best ask and best bid, when both sides have orders.
    pub fn spread(&self) -> Option<i64> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => Some(ask - bid),
            _ => None,
        }
    }

    /// Price of the most recent fill.
    pub fn last_trade_price(&self) -> Option<i64> {
        self.last_trade_price
    }

    /// Snapshot lookup of a live (resting or trigger-pending) order.
    pub fn order(&self, order_id: Uuid) -> Option<&Order> {
        self.bids
            .get(order_id)
            .or_else(|| self.asks.get(order_id))
            .or_else(|| self.pending_stops.iter().find(|o| o.id == order_id))
    }

    /// The bid side of the book.
    pub fn bids(&self) -> &BookSide {
        &self.bids
    }

    /// The ask side of the book.
    pub fn asks(&self) -> &BookSide {
        &self.asks
    }

    /// Stop orders still waiting for their trigger, in arrival order.
    pub fn pending_stops(&self) -> &[Order] {
        &self.pending_stops
    }

    /// The injected listener.
    pub fn listener(&self) -> &L {
        &self.listener
    }

    //----------------------------------------------------------------------------------------------
    // Internals
    //----------------------------------------------------------------------------------------------

    /// Matches `order` against the opposite side, then rests or discards the residual.
    /// Returns the processed order's final snapshot.
    fn execute(&mut self, mut order: Order, trades: &mut Vec<Trade>) -> EngineResult<Order> {
        let taker_limit = order.limit_price;

        // All-or-none is atomic: no fill is committed unless the liquidity across every
        // acceptable level covers the full remaining quantity.
        let can_match = !order.all_or_none
            || self.opposite_ref(order.side).available_quantity(taker_limit) >= order.remaining;

        if can_match {
            while order.remaining > 0 {
                let quantity = {
                    let opposite = self.opposite_ref(order.side);
                    let best = match opposite.best_price() {
                        Ok(price) => price,
                        Err(_) => break,
                    };
                    if !opposite.price_compatible(best, taker_limit) {
                        break;
                    }
                    let front = match opposite.peek_front() {
                        Some(front) => front,
                        None => break,
                    };
                    std::cmp::min(order.remaining, front.remaining)
                };

                let maker = self.opposite_mut(order.side).consume_front(quantity)?;
                let price = maker.limit_price.ok_or(BookError::NoLimitPrice)?;
                order.apply_fill(quantity);
                self.last_trade_price = Some(price);
                trades.push(Trade::new(maker.id, order.id, quantity, price));
                debug!(
                    taker_id = %order.id,
                    maker_id = %maker.id,
                    quantity,
                    price,
                    "fill"
                );
                self.listener.on_fill(&order, &maker, quantity, price);
            }
        }

        if order.remaining > 0 {
            if order.immediate_or_cancel || order.is_market() {
                // Market orders carry no price to rest at; both discard the residual. This is
                // still a normal accept, not a reject.
                order.status = if order.filled == 0 {
                    OrderStatus::Cancelled
                } else {
                    OrderStatus::PartiallyFilledCancelled
                };
                order.updated_at = Utc::now();
                debug!(order_id = %order.id, residual = order.remaining, "residual discarded");
            } else {
                order.status = if order.filled == 0 {
                    OrderStatus::Unfilled
                } else {
                    OrderStatus::PartiallyFilled
                };
                order.updated_at = Utc::now();
                self.side_mut(order.side).insert(order.clone())?;
                debug!(order_id = %order.id, remaining = order.remaining, "residual rested");
            }
        }

        Ok(order)
    }

    /// Activates pending stops whose trigger a fill of this operation has crossed. Every print
    /// of the pass is evaluated in order, not just the final one, so a trigger crossed
    /// transiently mid-sweep still fires. Stops qualifying on the same print activate earliest
    /// arrival first, and the prints their own fills produce are evaluated in turn.
    fn activate_triggered_stops(&mut self, trades: &mut Vec<Trade>) -> EngineResult<()> {
        let mut scanned = 0;
        while scanned < trades.len() {
            let print = trades[scanned].price;
            scanned += 1;
            loop {
                let position = self.pending_stops.iter().position(|order| {
                    order.stop_price.map_or(false, |stop| match order.side {
                        Side::Bid => print >= stop,
                        Side::Ask => print <= stop,
                    })
                });
                let Some(position) = position else {
                    break;
                };

                let mut order = self.pending_stops.remove(position);
                order.status = OrderStatus::Submitted;
                order.updated_at = Utc::now();
                debug!(order_id = %order.id, stop_price = ?order.stop_price, "stop order triggered");
                self.execute(order, trades)?;
            }
        }
        Ok(())
    }

    fn validate(&self, request: &OrderRequest) -> Result<(), String> {
        if request.quantity == 0 {
            return Err("quantity must be positive".to_string());
        }
        if let Some(price) = request.limit_price {
            if price <= 0 {
                return Err(format!("invalid limit price {price}"));
            }
        }
        if let Some(stop_price) = request.stop_price {
            if stop_price <= 0 {
                return Err(format!("invalid stop price {stop_price}"));
            }
        }
        let live = self.bids.contains(request.id)
            || self.asks.contains(request.id)
            || self.pending_stops.iter().any(|o| o.id == request.id);
        if live {
            return Err("order id already in use by a live order".to_string());
        }
        Ok(())
    }

    /// Whether a stop at `stop_price` on `side` has been triggered by the last trade.
    fn stop_triggered(&self, side: Side, stop_price: i64) -> bool {
        match self.last_trade_price {
            None => false,
            Some(last) => match side {
                Side::Bid => last >= stop_price,
                Side::Ask => last <= stop_price,
            },
        }
    }

    fn reject_replace(&mut self, order_id: Uuid, reason: &str) -> EngineError {
        self.listener.on_replace_reject(order_id, reason);
        EngineError::ReplaceReject {
            order_id,
            reason: reason.to_string(),
        }
    }

    fn resting_side(&self, order_id: Uuid) -> Option<Side> {
        if self.bids.contains(order_id) {
            Some(Side::Bid)
        } else if self.asks.contains(order_id) {
            Some(Side::Ask)
        } else {
            None
        }
    }

    fn side_ref(&self, side: Side) -> &BookSide {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BookSide {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }

    fn opposite_ref(&self, side: Side) -> &BookSide {
        self.side_ref(side.opposite())
    }

    fn opposite_mut(&mut self, side: Side) -> &mut BookSide {
        self.side_mut(side.opposite())
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence_id = self.next_sequence_id;
        self.next_sequence_id += 1;
        sequence_id
    }
}
