//! Order ingestion and admission: smooths bursty UDP arrivals into small
//! batches, reorders each batch by slack (Least-Slack-Time-First), then
//! feeds every order through the production manager in that order.
//!
//! Responsibilities:
//! - Own the datagram socket and the buffering/flush timer.
//! - Resolve client/pizza lookups (triggering catalog refills) before
//!   computing slack and before calling `find_and_assign`.
//! - Update stats on every outcome.
//!
//! Non-responsibilities:
//! - Feasibility itself (`ProductionManager::find_and_assign`).
//! - Catalog storage (`Catalog`).

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local};
use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::catalog::ingredient_tally;
use crate::error::AppError;
use crate::order::Order;
use crate::stats::SharedContext;
use crate::time;

/// Orders are flushed once the buffer reaches this size.
pub const BATCH_SIZE: usize = 4;
/// Orders are flushed once this many seconds have elapsed since the
/// first order was buffered, even if `BATCH_SIZE` has not been reached.
pub const BATCH_TIMEOUT: StdDuration = StdDuration::from_secs(12);

/// Owns the UDP socket and the batching buffer for the process lifetime.
pub struct Controller {
    socket: UdpSocket,
    batch_size: usize,
    batch_timeout: StdDuration,
    ctx: SharedContext,
}

impl Controller {
    pub fn new(socket: UdpSocket, batch_size: usize, batch_timeout: StdDuration, ctx: SharedContext) -> Self {
        Self {
            socket,
            batch_size,
            batch_timeout,
            ctx,
        }
    }

    /// Runs until cancellation. Suspends in exactly one place: waiting
    /// for the next datagram or the flush deadline, whichever comes
    /// first. All work between suspensions is CPU-bound and runs to
    /// completion.
    pub async fn run(&mut self, shutdown: &mut tokio::sync::watch::Receiver<bool>) {
        let mut buffer: Vec<Order> = Vec::new();
        let mut first_arrival: Option<DateTime<Local>> = None;
        let mut recv_buf = [0u8; 2048];

        loop {
            let deadline = match first_arrival {
                Some(start) => {
                    let elapsed = time::now() - start;
                    let elapsed_std = elapsed.to_std().unwrap_or(StdDuration::ZERO);
                    let remaining = self.batch_timeout.saturating_sub(elapsed_std);
                    Some(Instant::now() + remaining)
                }
                None => None,
            };

            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("order agent shutting down; discarding in-flight batch");
                        return;
                    }
                }
                result = self.socket.recv_from(&mut recv_buf) => {
                    match result {
                        Ok((n, _addr)) => {
                            let line = String::from_utf8_lossy(&recv_buf[..n]);
                            match Order::parse(&line, time::now()) {
                                Ok(order) => {
                                    if buffer.is_empty() {
                                        first_arrival = Some(time::now());
                                    }
                                    debug!(buffer_len = buffer.len() + 1, "order buffered");
                                    buffer.push(order);
                                }
                                Err(e) => {
                                    let err = AppError::MalformedOrder(e.to_string());
                                    warn!(error = %err, "discarding malformed order");
                                }
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "udp recv failed");
                        }
                    }
                }
                _ = wait_until(deadline) => {}
            }

            let is_full = buffer.len() >= self.batch_size;
            let is_timed_out = first_arrival
                .map(|start| time::now() - start >= Duration::from_std(self.batch_timeout).unwrap_or(Duration::zero()))
                .unwrap_or(false);

            if !buffer.is_empty() && (is_full || is_timed_out) {
                self.flush(&mut buffer).await;
                first_arrival = None;
            }
        }
    }

    /// Sorts the buffer by slack, then attempts feasibility for each
    /// order in that order, updating stats per outcome.
    #[instrument(skip(self, buffer), fields(batch_len = buffer.len()))]
    async fn flush(&self, buffer: &mut Vec<Order>) {
        let mut keyed = Vec::with_capacity(buffer.len());
        for order in buffer.drain(..) {
            let slack = self.slack_of(&order);
            keyed.push((slack, order));
        }
        keyed.sort_by(|a, b| a.0.cmp(&b.0));

        for (_, order) in keyed {
            self.process_one(order).await;
        }
    }

    /// `slack = timeAvailable - (client.distance + pizza.productionTime)`.
    /// A missing client or pizza substitutes `distance = 0` /
    /// `productionTime = 999` for this computation only, so such orders
    /// sort last but are still attempted. An order with an unparseable
    /// clock-time never reaches the buffer (rejected at parse time), so
    /// `timeAvailable` is always defined here.
    ///
    /// Looks up the catalog via the non-refilling `peek_*` accessors: a
    /// refill here, before the batch is sorted, would let one order's
    /// cache-warming affect another order's slack within the same flush.
    /// The refill-capable path runs only in `process_one`, after sorting.
    fn slack_of(&self, order: &Order) -> Duration {
        let time_available = order.time_available();

        let distance = match self.ctx.catalog.peek_client(order.client_id) {
            Some(c) => c.distance_minutes,
            None => 0,
        };
        let production_time = match self
            .ctx
            .catalog
            .peek_pizza(&order.pizza_name, order.pizza_size)
        {
            Some(p) => p.production_time_minutes,
            None => 999,
        };

        time_available - Duration::minutes(distance + production_time)
    }

    /// Resolves the order against the catalog (triggering a refill on
    /// miss), then attempts feasibility via the production manager.
    #[instrument(skip(self), fields(client_id = order.client_id, pizza = %order.pizza_name))]
    async fn process_one(&self, order: Order) {
        let client = self.ctx.catalog.get_client(order.client_id).await;
        let pizza = self
            .ctx
            .catalog
            .get_pizza(&order.pizza_name, order.pizza_size)
            .await;

        let (Some(client), Some(pizza)) = (client, pizza) else {
            let err = AppError::UnknownEntity(format!(
                "client {} or pizza {}/{:?}",
                order.client_id, order.pizza_name, order.pizza_size
            ));
            warn!(error = %err, "refusing order");
            self.ctx.stats.record_refused();
            return;
        };

        let now = time::now();
        let production_deadline = order.delivery_deadline() - Duration::minutes(client.distance_minutes);

        let commitment = self.ctx.production.find_and_assign(
            &order.pizza_name,
            order.pizza_size,
            order.quantity,
            Duration::minutes(pizza.production_time_minutes),
            production_deadline,
            now,
        );

        match commitment {
            Some(c) => {
                info!(station_id = c.station_id, end = %c.end, "order accepted");
                let tally = ingredient_tally(&pizza.composition, order.quantity);
                self.ctx.stats.record_accepted(&tally);
            }
            None => {
                warn!(error = %AppError::NoFeasibleStation, "refusing order");
                self.ctx.stats.record_refused();
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending::<()>().await,
    }
}
