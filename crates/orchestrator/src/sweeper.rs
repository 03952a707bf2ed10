//! Periodic reservation-expiry sweep.

use std::sync::Arc;
use std::time::Duration;

use common::Clock;
use kardex::MovementJournal;
use reservations::ReservationStore;
use stock_store::StockStore;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::orchestrator::Orchestrator;
use crate::ports::{CatalogLookup, LocationLookup};

/// Drives [`Orchestrator::expire_due`] on a fixed period until told to
/// stop.
///
/// The sweep is the only background activity in the system. Each tick runs
/// one sweep; each reservation inside a sweep is its own atomic unit, so
/// shutdown between reservations never leaves one half-transitioned.
pub struct ExpirySweeper<S, J, R, Cat, Loc, C> {
    orchestrator: Arc<Orchestrator<S, J, R, Cat, Loc, C>>,
    period: Duration,
}

impl<S, J, R, Cat, Loc, C> ExpirySweeper<S, J, R, Cat, Loc, C>
where
    S: StockStore + Clone,
    J: MovementJournal,
    R: ReservationStore,
    Cat: CatalogLookup,
    Loc: LocationLookup,
    C: Clock + Clone,
{
    /// Creates a sweeper over the given orchestrator.
    pub fn new(orchestrator: Arc<Orchestrator<S, J, R, Cat, Loc, C>>, period: Duration) -> Self {
        Self {
            orchestrator,
            period,
        }
    }

    /// Runs the sweep loop until the shutdown signal flips to `true` or
    /// the sender side is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first interval tick fires immediately; skip it so a freshly
        // started sweeper waits one full period.
        ticker.tick().await;

        tracing::info!(period_ms = self.period.as_millis() as u64, "expiry sweeper started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.orchestrator.expire_due().await {
                        Ok(changes) if !changes.is_empty() => {
                            tracing::info!(count = changes.len(), "expiry sweep transitioned reservations");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "expiry sweep failed, will retry next tick");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("expiry sweeper stopped");
    }
}
