//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// The outbound event contract of the matching engine: a listener trait with one method per
// lifecycle event, injected at engine construction. Exactly one listener is active per book, so
// the engine is generic over the implementation and no dynamic dispatch is involved.
//
// | Component        | Description                                                   |
// |------------------|---------------------------------------------------------------|
// | OrderListener    | Callback trait; every method has a no-op default body         |
// | NullListener     | Drops every event                                             |
// | TracingListener  | Renders every event as a structured tracing line              |
//--------------------------------------------------------------------------------------------------

use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::models::types::Order;

/// Receives lifecycle notifications from the matching engine.
///
/// Callbacks are invoked synchronously while the engine mutates its state; the engine holds
/// `&mut self` for the whole operation, so a listener cannot re-enter it. Implementations that
/// need to feed events back into the engine must queue them and drain the queue after the
/// originating call returns.
pub trait OrderListener {
    /// The order is valid and has entered the engine (resting, trigger-pending, or about to
    /// match). Always emitted before any fills from the same submission.
    fn on_accept(&mut self, _order: &Order) {}

    /// The order was invalid and never touched the book.
    fn on_reject(&mut self, _order: &Order, _reason: &str) {}

    /// A trade executed. Emitted once per (incoming, resting) pair; `order` is the taker and
    /// `matched_order` the maker, whose price governs `fill_price`.
    fn on_fill(&mut self, _order: &Order, _matched_order: &Order, _fill_quantity: u64, _fill_price: i64) {}

    /// The order was removed from the book (or the pending-trigger set) before completion.
    fn on_cancel(&mut self, _order: &Order) {}

    /// A cancel request failed: unknown id, already filled, or already cancelled.
    fn on_cancel_reject(&mut self, _order_id: Uuid, _reason: &str) {}

    /// The order was modified. `new_price` is the effective price after the replace; a price
    /// change has already reset the order's time priority when this fires.
    fn on_replace(&mut self, _order: &Order, _quantity_delta: i64, _new_price: i64) {}

    /// A replace request failed: unknown id, terminal order, or invalid resulting state.
    fn on_replace_reject(&mut self, _order_id: Uuid, _reason: &str) {}
}

/// A listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl OrderListener for NullListener {}

/// A listener that logs every event through `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingListener;

impl OrderListener for TracingListener {
    fn on_accept(&mut self, order: &Order) {
        info!(
            order_id = %order.id,
            side = ?order.side,
            quantity = order.quantity,
            price = ?order.limit_price,
            "order accepted"
        );
    }

    fn on_reject(&mut self, order: &Order, reason: &str) {
        warn!(order_id = %order.id, reason, "order rejected");
    }

    fn on_fill(&mut self, order: &Order, matched_order: &Order, fill_quantity: u64, fill_price: i64) {
        info!(
            taker_id = %order.id,
            maker_id = %matched_order.id,
            fill_quantity,
            fill_price,
            taker_remaining = order.remaining,
            "trade executed"
        );
    }

    fn on_cancel(&mut self, order: &Order) {
        info!(order_id = %order.id, remaining = order.remaining, "order cancelled");
    }

    fn on_cancel_reject(&mut self, order_id: Uuid, reason: &str) {
        warn!(%order_id, reason, "cancel rejected");
    }

    fn on_replace(&mut self, order: &Order, quantity_delta: i64, new_price: i64) {
        info!(
            order_id = %order.id,
            quantity_delta,
            new_price,
            remaining = order.remaining,
            "order replaced"
        );
    }

    fn on_replace_reject(&mut self, order_id: Uuid, reason: &str) {
        warn!(%order_id, reason, "replace rejected");
    }
}
