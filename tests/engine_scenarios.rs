//! End-to-end scenarios driving the engine through its public API and asserting on the exact
//! event stream a listener observes.

use uuid::Uuid;

use matchbook::{
    EngineError, MatchingEngine, Order, OrderListener, OrderRequest, OrderStatus, Side,
};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Event {
    Accept {
        order_id: Uuid,
    },
    Reject {
        order_id: Uuid,
        reason: String,
    },
    Fill {
        taker_id: Uuid,
        maker_id: Uuid,
        quantity: u64,
        price: i64,
    },
    Cancel {
        order_id: Uuid,
    },
    CancelReject {
        order_id: Uuid,
    },
    Replace {
        order_id: Uuid,
        quantity_delta: i64,
        new_price: i64,
    },
    ReplaceReject {
        order_id: Uuid,
    },
}

/// Captures every callback in arrival order.
#[derive(Debug, Default)]
struct RecordingListener {
    events: Vec<Event>,
}

impl OrderListener for RecordingListener {
    fn on_accept(&mut self, order: &Order) {
        self.events.push(Event::Accept { order_id: order.id });
    }

    fn on_reject(&mut self, order: &Order, reason: &str) {
        self.events.push(Event::Reject {
            order_id: order.id,
            reason: reason.to_string(),
        });
    }

    fn on_fill(&mut self, order: &Order, matched_order: &Order, fill_quantity: u64, fill_price: i64) {
        self.events.push(Event::Fill {
            taker_id: order.id,
            maker_id: matched_order.id,
            quantity: fill_quantity,
            price: fill_price,
        });
    }

    fn on_cancel(&mut self, order: &Order) {
        self.events.push(Event::Cancel { order_id: order.id });
    }

    fn on_cancel_reject(&mut self, order_id: Uuid, _reason: &str) {
        self.events.push(Event::CancelReject { order_id });
    }

    fn on_replace(&mut self, order: &Order, quantity_delta: i64, new_price: i64) {
        self.events.push(Event::Replace {
            order_id: order.id,
            quantity_delta,
            new_price,
        });
    }

    fn on_replace_reject(&mut self, order_id: Uuid, _reason: &str) {
        self.events.push(Event::ReplaceReject { order_id });
    }
}

fn engine() -> MatchingEngine<RecordingListener> {
    MatchingEngine::new(RecordingListener::default())
}

fn limit(side: Side, quantity: u64, price: i64) -> OrderRequest {
    OrderRequest::limit(Uuid::new_v4(), side, quantity, price)
}

#[test]
fn trading_session_event_stream() {
    let mut engine = engine();

    // A resting sell, then a buy that takes it completely.
    let sell = limit(Side::Ask, 100, 5_000);
    let buy = limit(Side::Bid, 100, 5_000);
    let (sell_id, buy_id) = (sell.id, buy.id);
    engine.submit(sell).unwrap();
    engine.submit(buy).unwrap();

    assert_eq!(
        engine.listener().events,
        vec![
            Event::Accept { order_id: sell_id },
            Event::Accept { order_id: buy_id },
            Event::Fill {
                taker_id: buy_id,
                maker_id: sell_id,
                quantity: 100,
                price: 5_000,
            },
        ]
    );
    assert_eq!(engine.last_trade_price(), Some(5_000));
    assert_eq!(engine.best_bid(), None);
    assert_eq!(engine.best_ask(), None);
}

#[test]
fn partial_fill_leaves_maker_resting() {
    let mut engine = engine();

    let sell = limit(Side::Ask, 200, 5_100);
    let sell_id = sell.id;
    engine.submit(sell).unwrap();
    let buy = engine.submit(limit(Side::Bid, 75, 5_100)).unwrap();

    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].quantity, 75);
    assert_eq!(buy.trades[0].quote_amount, 75 * 5_100);
    assert_eq!(buy.order.status, OrderStatus::Filled);

    let maker = engine.order(sell_id).expect("maker still resting");
    assert_eq!(maker.remaining, 125);
    assert_eq!(maker.filled, 75);
    assert_eq!(engine.asks().volume_at_price(5_100), Some(125));
}

#[test]
fn non_crossing_orders_rest_on_both_sides() {
    let mut engine = engine();
    engine.submit(limit(Side::Bid, 100, 4_800)).unwrap();
    engine.submit(limit(Side::Ask, 100, 5_300)).unwrap();

    assert!(engine
        .listener()
        .events
        .iter()
        .all(|e| matches!(e, Event::Accept { .. })));
    assert_eq!(engine.best_bid(), Some(4_800));
    assert_eq!(engine.best_ask(), Some(5_300));
    assert_eq!(engine.spread(), Some(500));
}

#[test]
fn market_order_takes_resting_liquidity() {
    let mut engine = engine();
    let sell = limit(Side::Ask, 125, 5_100);
    let sell_id = sell.id;
    engine.submit(sell).unwrap();

    let buy = engine
        .submit(OrderRequest::market(Uuid::new_v4(), Side::Bid, 125))
        .unwrap();
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].maker_order_id, sell_id);
    assert_eq!(buy.trades[0].price, 5_100);
    assert_eq!(buy.order.status, OrderStatus::Filled);
    assert_eq!(engine.best_ask(), None);
}

#[test]
fn same_price_level_matches_fifo() {
    let mut engine = engine();
    let first = limit(Side::Ask, 100, 5_000);
    let second = limit(Side::Ask, 100, 5_000);
    let (first_id, second_id) = (first.id, second.id);
    engine.submit(first).unwrap();
    engine.submit(second).unwrap();

    let buy = engine.submit(limit(Side::Bid, 150, 5_000)).unwrap();
    assert_eq!(buy.trades.len(), 2);
    assert_eq!(buy.trades[0].maker_order_id, first_id);
    assert_eq!(buy.trades[0].quantity, 100);
    assert_eq!(buy.trades[1].maker_order_id, second_id);
    assert_eq!(buy.trades[1].quantity, 50);

    // The later arrival keeps its queue slot after the partial fill.
    assert_eq!(engine.asks().peek_front().map(|o| o.id), Some(second_id));
    assert_eq!(engine.asks().volume_at_price(5_000), Some(50));
}

#[test]
fn better_prices_match_before_earlier_arrivals() {
    let mut engine = engine();
    let early_worse = limit(Side::Ask, 100, 5_200);
    let late_better = limit(Side::Ask, 100, 5_100);
    let late_better_id = late_better.id;
    engine.submit(early_worse).unwrap();
    engine.submit(late_better).unwrap();

    let buy = engine.submit(limit(Side::Bid, 100, 5_200)).unwrap();
    assert_eq!(buy.trades.len(), 1);
    assert_eq!(buy.trades[0].maker_order_id, late_better_id);
    assert_eq!(buy.trades[0].price, 5_100);
}

#[test]
fn reject_emits_event_and_leaves_book_untouched() {
    let mut engine = engine();
    engine.submit(limit(Side::Ask, 100, 5_000)).unwrap();

    let bad = limit(Side::Bid, 0, 5_000);
    let bad_id = bad.id;
    let err = engine.submit(bad).unwrap_err();
    assert!(matches!(err, EngineError::ValidationReject { order_id, .. } if order_id == bad_id));
    assert!(engine
        .listener()
        .events
        .iter()
        .any(|e| matches!(e, Event::Reject { order_id, .. } if *order_id == bad_id)));
    assert_eq!(engine.asks().volume_at_price(5_000), Some(100));
}

#[test]
fn cancel_emits_cancel_then_reject_on_retry() {
    let mut engine = engine();
    let resting = engine.submit(limit(Side::Bid, 100, 4_800)).unwrap();
    let order_id = resting.order.id;

    engine.cancel(order_id).unwrap();
    let err = engine.cancel(order_id).unwrap_err();
    assert!(matches!(err, EngineError::CancelReject { .. }));

    assert_eq!(
        engine.listener().events[1..],
        [
            Event::Cancel { order_id },
            Event::CancelReject { order_id },
        ]
    );
}

#[test]
fn partially_filled_cancel_reports_remaining() {
    let mut engine = engine();
    let sell = engine.submit(limit(Side::Ask, 200, 5_000)).unwrap();
    engine.submit(limit(Side::Bid, 60, 5_000)).unwrap();

    let cancelled = engine.cancel(sell.order.id).unwrap();
    assert_eq!(cancelled.status, OrderStatus::PartiallyFilledCancelled);
    assert_eq!(cancelled.filled, 60);
    assert_eq!(cancelled.remaining, 140);
}

#[test]
fn replace_emits_event_before_resulting_fills() {
    let mut engine = engine();
    let ask = limit(Side::Ask, 100, 5_200);
    let ask_id = ask.id;
    engine.submit(ask).unwrap();
    let bid = engine.submit(limit(Side::Bid, 100, 5_000)).unwrap();
    let bid_id = bid.order.id;

    let result = engine.replace(bid_id, 0, Some(5_200)).unwrap();
    assert_eq!(result.trades.len(), 1);

    let events = &engine.listener().events;
    let replace_at = events
        .iter()
        .position(|e| matches!(e, Event::Replace { order_id, .. } if *order_id == bid_id))
        .expect("replace event");
    let fill_at = events
        .iter()
        .position(|e| {
            matches!(e, Event::Fill { taker_id, maker_id, .. }
                if *taker_id == bid_id && *maker_id == ask_id)
        })
        .expect("fill event");
    assert!(replace_at < fill_at);
}

#[test]
fn replace_reject_for_unknown_order() {
    let mut engine = engine();
    let order_id = Uuid::new_v4();
    let err = engine.replace(order_id, 10, None).unwrap_err();
    assert!(matches!(err, EngineError::ReplaceReject { .. }));
    assert_eq!(
        engine.listener().events,
        vec![Event::ReplaceReject { order_id }]
    );
}

#[test]
fn ioc_never_rests_and_emits_no_cancel() {
    let mut engine = engine();
    engine.submit(limit(Side::Ask, 50, 5_000)).unwrap();

    let ioc = OrderRequest::limit(Uuid::new_v4(), Side::Bid, 80, 5_000).with_immediate_or_cancel();
    let ioc_id = ioc.id;
    let result = engine.submit(ioc).unwrap();
    assert_eq!(result.trades.len(), 1);
    assert_eq!(result.order.status, OrderStatus::PartiallyFilledCancelled);
    assert_eq!(engine.best_bid(), None);

    // The discarded residual is part of the normal accept, not a cancel.
    assert!(!engine
        .listener()
        .events
        .iter()
        .any(|e| matches!(e, Event::Cancel { order_id } if *order_id == ioc_id)));
}

#[test]
fn fill_or_kill_fills_completely_or_not_at_all() {
    let mut engine = engine();
    engine.submit(limit(Side::Ask, 60, 5_000)).unwrap();
    engine.submit(limit(Side::Ask, 60, 5_100)).unwrap();

    let starved = OrderRequest::limit(Uuid::new_v4(), Side::Bid, 200, 5_100)
        .with_all_or_none()
        .with_immediate_or_cancel();
    let result = engine.submit(starved).unwrap();
    assert!(result.trades.is_empty());
    assert_eq!(result.order.status, OrderStatus::Cancelled);
    assert_eq!(engine.asks().len(), 2);

    let covered = OrderRequest::limit(Uuid::new_v4(), Side::Bid, 120, 5_100)
        .with_all_or_none()
        .with_immediate_or_cancel();
    let result = engine.submit(covered).unwrap();
    assert_eq!(result.trades.len(), 2);
    assert_eq!(result.order.status, OrderStatus::Filled);
    assert!(engine.asks().is_empty());
}

#[test]
fn stop_orders_cascade() {
    let mut engine = engine();

    // Two sell stops below the market, plus bids for them to hit once live.
    let first_stop = OrderRequest::market(Uuid::new_v4(), Side::Ask, 50).with_stop_price(4_900);
    let second_stop = OrderRequest::market(Uuid::new_v4(), Side::Ask, 50).with_stop_price(4_800);
    engine.submit(first_stop).unwrap();
    engine.submit(second_stop).unwrap();
    engine.submit(limit(Side::Bid, 50, 4_800)).unwrap();
    engine.submit(limit(Side::Bid, 50, 4_700)).unwrap();
    assert_eq!(engine.pending_stops().len(), 2);

    // A trade at 4900 triggers the first stop; its fill at 4800 triggers the second.
    engine.submit(limit(Side::Bid, 20, 4_900)).unwrap();
    let result = engine.submit(limit(Side::Ask, 20, 4_900)).unwrap();

    assert_eq!(engine.pending_stops().len(), 0);
    let fills = engine
        .listener()
        .events
        .iter()
        .filter(|e| matches!(e, Event::Fill { .. }))
        .count();
    // Seed trade + first stop hitting the 4800 bid + second stop hitting the 4700 bid.
    assert_eq!(fills, 3);
    assert_eq!(result.trades.len(), 3);
    assert_eq!(engine.last_trade_price(), Some(4_700));
    assert!(engine.bids().is_empty());
}

#[test]
fn trade_quantities_are_conserved() {
    let mut engine = engine();
    engine.submit(limit(Side::Ask, 30, 5_000)).unwrap();
    engine.submit(limit(Side::Ask, 30, 5_050)).unwrap();
    engine.submit(limit(Side::Ask, 30, 5_100)).unwrap();

    let buy = engine.submit(limit(Side::Bid, 100, 5_100)).unwrap();
    let traded: u64 = buy.trades.iter().map(|t| t.quantity).sum();
    assert_eq!(traded, 90);
    assert_eq!(buy.order.filled, 90);
    assert_eq!(buy.order.quantity, buy.order.filled + buy.order.remaining);
    // Residual 10 rests at the limit.
    assert_eq!(engine.bids().volume_at_price(5_100), Some(10));
}
