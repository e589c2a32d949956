//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// One side of a limit order book for a single instrument, holding resting orders in price-time
// priority: price levels in a BTreeMap (bids best-first when iterated descending, asks ascending)
// and a FIFO queue of orders within each level.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | PriceLevel    | FIFO queue of orders at one price, with a maintained volume aggregate     |
// | BookSide      | Ordered price -> PriceLevel map plus an id -> price index for removal     |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                  | Return Type            |
// |-----------------------|----------------------------------------------|------------------------|
// | best_price            | Best resting price on this side              | Result<i64, BookError> |
// | insert                | Rest an order at its limit price             | Result<(), BookError>  |
// | remove                | Remove a resting order by id                 | Result<Order, BookError>|
// | peek_front            | Next order to be matched                     | Option<&Order>         |
// | consume_front         | Fill the front of the best level in place    | Result<Order, BookError>|
// | adjust_quantity       | In-place size change preserving queue slot   | Result<Order, BookError>|
// | available_quantity    | Liquidity at prices a taker would accept     | u64                    |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap, VecDeque};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::models::types::{Order, Side};

/// Errors that can occur during book side operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BookError {
    /// The side has no resting orders; a defined empty result, not an engine failure.
    #[error("book side has no resting orders")]
    EmptyBook,

    /// Order not found on this side.
    #[error("order {0} not found in the book")]
    OrderNotFound(Uuid),

    /// The id index pointed at a price with no level. Indicates a bookkeeping bug.
    #[error("no price level at {0}")]
    MissingLevel(i64),

    /// Market orders carry no price to rest at.
    #[error("market orders cannot rest in the book")]
    NoLimitPrice,
}

/// A price level: the FIFO queue of resting orders at one price on one side.
///
/// Invariant: every queued order has `remaining > 0` and `total_volume` equals the sum of the
/// queued remainings.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    /// The price for this level.
    pub price: i64,
    /// Time-ordered queue of resting orders.
    orders: VecDeque<Order>,
    /// Sum of remaining quantity across the queue.
    total_volume: u64,
}

impl PriceLevel {
    fn new(price: i64) -> Self {
        Self {
            price,
            orders: VecDeque::with_capacity(4),
            total_volume: 0,
        }
    }

    /// Returns the next order to be matched at this level without removing it.
    #[inline]
    pub fn peek_front(&self) -> Option<&Order> {
        self.orders.front()
    }

    /// Iterates the queued orders in time priority.
    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    /// Number of orders queued at this level.
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    /// Sum of remaining quantity across the queue.
    pub fn total_volume(&self) -> u64 {
        self.total_volume
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// One side of the book: an ordered map from price to `PriceLevel` plus an id -> price index.
///
/// Invariants: a level is removed once its queue empties; no two levels share a price; the cached
/// best price is the highest level for bids and the lowest for asks.
#[derive(Debug)]
pub struct BookSide {
    /// Which side this is; determines priority ordering and price compatibility.
    side: Side,
    /// Price levels keyed by price.
    levels: BTreeMap<i64, PriceLevel>,
    /// Cache of the best price for quick access; `None` when the side is empty.
    best: Option<i64>,
    /// O(1) order location lookup by id.
    order_index: HashMap<Uuid, i64>,
}

impl BookSide {
    /// Creates an empty side.
    pub fn new(side: Side) -> Self {
        Self {
            side,
            levels: BTreeMap::new(),
            best: None,
            order_index: HashMap::new(),
        }
    }

    /// Which side of the book this is.
    pub fn side(&self) -> Side {
        self.side
    }

    /// Returns the best resting price: highest for bids, lowest for asks.
    ///
    /// # Errors
    /// `BookError::EmptyBook` when no orders rest on this side.
    #[inline]
    pub fn best_price(&self) -> Result<i64, BookError> {
        self.best.ok_or(BookError::EmptyBook)
    }

    /// Rests an order at its limit price, appended behind existing orders at that price.
    ///
    /// O(log L) to locate the level, O(1) to append.
    ///
    /// # Errors
    /// `BookError::NoLimitPrice` for a market order.
    pub fn insert(&mut self, order: Order) -> Result<(), BookError> {
        let price = order.limit_price.ok_or(BookError::NoLimitPrice)?;

        let level = self.levels.entry(price).or_insert_with(|| PriceLevel::new(price));
        level.total_volume = level.total_volume.saturating_add(order.remaining);
        self.order_index.insert(order.id, price);
        level.orders.push_back(order);

        match self.side {
            Side::Bid if self.best.map_or(true, |p| price > p) => self.best = Some(price),
            Side::Ask if self.best.map_or(true, |p| price < p) => self.best = Some(price),
            _ => {}
        }

        Ok(())
    }

    /// Removes a resting order by id, cleaning up an emptied level.
    ///
    /// O(log L) via the id index plus a short scan within the level.
    ///
    /// # Errors
    /// `BookError::OrderNotFound` if the id does not rest on this side.
    pub fn remove(&mut self, order_id: Uuid) -> Result<Order, BookError> {
        let price = self
            .order_index
            .remove(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;

        let level = self.levels.get_mut(&price).ok_or(BookError::MissingLevel(price))?;
        let position = level
            .orders
            .iter()
            .position(|o| o.id == order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;
        let order = level
            .orders
            .remove(position)
            .ok_or(BookError::OrderNotFound(order_id))?;
        level.total_volume = level.total_volume.saturating_sub(order.remaining);

        if level.orders.is_empty() {
            self.levels.remove(&price);
            if self.best == Some(price) {
                self.update_best();
            }
        }

        Ok(order)
    }

    /// Returns the next order to be matched on this side: the front of the best level.
    #[inline]
    pub fn peek_front(&self) -> Option<&Order> {
        self.best
            .and_then(|price| self.levels.get(&price))
            .and_then(|level| level.peek_front())
    }

    /// Fills the front order of the best level by `quantity` units in place, so a partially
    /// filled maker keeps its queue position. The order is evicted once its remaining reaches 0,
    /// and an emptied level is removed.
    ///
    /// Callers guarantee `quantity` does not exceed the front order's remaining.
    ///
    /// # Returns
    /// A snapshot of the maker after the fill.
    pub fn consume_front(&mut self, quantity: u64) -> Result<Order, BookError> {
        let price = self.best.ok_or(BookError::EmptyBook)?;
        let level = self.levels.get_mut(&price).ok_or(BookError::MissingLevel(price))?;
        let front = level.orders.front_mut().ok_or(BookError::EmptyBook)?;

        front.apply_fill(quantity);
        let snapshot = front.clone();
        level.total_volume = level.total_volume.saturating_sub(quantity);

        if snapshot.remaining == 0 {
            level.orders.pop_front();
            self.order_index.remove(&snapshot.id);
            if level.orders.is_empty() {
                self.levels.remove(&price);
                self.update_best();
            }
        }

        Ok(snapshot)
    }

    /// Adjusts a resting order's quantity and remaining by `delta` without moving it in its
    /// queue. Callers validate that the result keeps `remaining > 0`.
    ///
    /// # Returns
    /// A snapshot of the order after the adjustment.
    pub fn adjust_quantity(&mut self, order_id: Uuid, delta: i64) -> Result<Order, BookError> {
        let price = *self
            .order_index
            .get(&order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;
        let level = self.levels.get_mut(&price).ok_or(BookError::MissingLevel(price))?;
        let order = level
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or(BookError::OrderNotFound(order_id))?;

        if delta >= 0 {
            order.quantity = order.quantity.saturating_add(delta as u64);
            order.remaining = order.remaining.saturating_add(delta as u64);
            level.total_volume = level.total_volume.saturating_add(delta as u64);
        } else {
            let reduction = delta.unsigned_abs();
            order.quantity = order.quantity.saturating_sub(reduction);
            order.remaining = order.remaining.saturating_sub(reduction);
            level.total_volume = level.total_volume.saturating_sub(reduction);
        }
        order.updated_at = Utc::now();

        Ok(order.clone())
    }

    /// Total resting quantity at prices acceptable to a taker with the given limit
    /// (`None` = market taker, everything is acceptable). Used by the all-or-none pre-check,
    /// which spans every acceptable level, not just the best.
    pub fn available_quantity(&self, taker_limit: Option<i64>) -> u64 {
        let mut total = 0u64;
        for level in self.levels() {
            if !self.price_compatible(level.price, taker_limit) {
                break;
            }
            total = total.saturating_add(level.total_volume);
        }
        total
    }

    /// Whether a level at `price` on this side is acceptable to a taker with the given limit.
    pub fn price_compatible(&self, price: i64, taker_limit: Option<i64>) -> bool {
        match (self.side, taker_limit) {
            (_, None) => true,
            (Side::Ask, Some(limit)) => price <= limit,
            (Side::Bid, Some(limit)) => price >= limit,
        }
    }

    /// Iterates price levels in priority order: descending for bids, ascending for asks.
    pub fn levels(&self) -> Box<dyn Iterator<Item = &PriceLevel> + '_> {
        match self.side {
            Side::Bid => Box::new(self.levels.values().rev()),
            Side::Ask => Box::new(self.levels.values()),
        }
    }

    /// Looks up a resting order by id.
    pub fn get(&self, order_id: Uuid) -> Option<&Order> {
        self.order_index.get(&order_id).and_then(|price| {
            self.levels
                .get(price)
                .and_then(|level| level.orders.iter().find(|o| o.id == order_id))
        })
    }

    /// Returns true if an order with this id rests on this side.
    pub fn contains(&self, order_id: Uuid) -> bool {
        self.order_index.contains_key(&order_id)
    }

    /// Total resting quantity at one price, if a level exists there.
    pub fn volume_at_price(&self, price: i64) -> Option<u64> {
        self.levels.get(&price).map(|level| level.total_volume)
    }

    /// Number of orders queued at one price.
    pub fn order_count_at_price(&self, price: i64) -> usize {
        self.levels.get(&price).map_or(0, |level| level.order_count())
    }

    /// Total number of resting orders on this side.
    pub fn len(&self) -> usize {
        self.order_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order_index.is_empty()
    }

    fn update_best(&mut self) {
        self.best = match self.side {
            Side::Bid => self.levels.keys().next_back().copied(),
            Side::Ask => self.levels.keys().next().copied(),
        };
    }
}
