//! Production floor: owns every station and decides where an order lands.
//!
//! Responsibilities:
//! - Reserve a station slot whose committed end respects a production
//!   deadline, using the earliest-completion-time policy across all
//!   candidate stations.
//! - Sweep completed tasks off every station before each attempt.
//!
//! Non-responsibilities:
//! - Catalog refills (the caller resolves client/pizza lookups first).
//! - Retrying a refused order against a different policy; a refusal here
//!   is final for that order.

use chrono::{DateTime, Duration, Local};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::station::{Size, Station};

/// Outcome of a successful assignment: which station took the order, and
/// when its task completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Commitment {
    pub station_id: i64,
    pub end: DateTime<Local>,
}

/// Owns the set of stations and serializes assignment against them.
pub struct ProductionManager {
    stations: Mutex<Vec<Station>>,
}

impl ProductionManager {
    pub fn new(stations: Vec<Station>) -> Self {
        Self {
            stations: Mutex::new(stations),
        }
    }

    /// Earliest-completion-time admission across all stations.
    ///
    /// Stations are visited in ascending id order; ties in completion
    /// time are broken in favor of the lower id as a direct consequence
    /// of the strict `<` comparison used to track the running best.
    #[instrument(skip(self), fields(pizza_name = %pizza_name, qty = qty))]
    pub fn find_and_assign(
        &self,
        pizza_name: &str,
        pizza_size: Size,
        qty: u32,
        duration: Duration,
        production_deadline: DateTime<Local>,
        now: DateTime<Local>,
    ) -> Option<Commitment> {
        let mut stations = self.stations.lock();
        for station in stations.iter_mut() {
            station.housekeep(now);
        }

        let mut best: Option<(usize, DateTime<Local>, DateTime<Local>)> = None;
        for (idx, station) in stations.iter().enumerate() {
            let Some(start) = station.earliest_start(pizza_name, pizza_size, qty, duration, now) else {
                continue;
            };
            let end = start + duration;
            if end > production_deadline {
                continue;
            }
            if best.map(|(_, _, best_end)| end < best_end).unwrap_or(true) {
                best = Some((idx, start, end));
            }
        }

        let (idx, start, end) = best?;
        let station = &mut stations[idx];
        let committed_end = station.assign(pizza_name, pizza_size, qty, duration, start);
        debug!(station_id = station.id, end = %committed_end, "order committed to station");
        Some(Commitment {
            station_id: station.id,
            end: committed_end,
        })
    }

    /// Read-only snapshot of every station, for the dashboard endpoint.
    pub fn snapshot(&self, now: DateTime<Local>) -> Vec<StationSnapshot> {
        self.stations
            .lock()
            .iter()
            .map(|s| StationSnapshot {
                id: s.id,
                available: s.available,
                max_capacity: s.max_capacity,
                current_load: s.load_at(now),
                size: s.supported_size,
                restrictions: s.restrictions.clone(),
            })
            .collect()
    }
}

/// A point-in-time view of one station, assembled under the shared lock
/// for the dashboard's `/api/stats` response.
#[derive(Clone, Debug)]
pub struct StationSnapshot {
    pub id: i64,
    pub available: bool,
    pub max_capacity: u32,
    pub current_load: u32,
    pub size: Size,
    pub restrictions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;

    fn manager(stations: Vec<Station>) -> ProductionManager {
        ProductionManager::new(stations)
    }

    #[test]
    fn refuses_when_no_station_fits_before_deadline() {
        let now = Local::now();
        let mgr = manager(vec![Station::new(1, 20, true, Size::Any, "")]);
        let deadline = now + Duration::minutes(5);
        let got = mgr.find_and_assign("Reine", Size::G, 5, Duration::minutes(10), deadline, now);
        assert!(got.is_none());
    }

    #[test]
    fn accepts_on_the_single_fitting_station() {
        let now = Local::now();
        let mgr = manager(vec![Station::new(1, 20, true, Size::Any, "")]);
        let deadline = now + Duration::minutes(30);
        let got = mgr
            .find_and_assign("Reine", Size::G, 5, Duration::minutes(10), deadline, now)
            .unwrap();
        assert_eq!(got.station_id, 1);
        assert_eq!(got.end, now + Duration::minutes(10));
    }

    #[test]
    fn picks_earliest_completion_across_stations() {
        let now = Local::now();
        let mut busy = Station::new(1, 20, true, Size::Any, "");
        busy.assign("Reine", Size::G, 5, Duration::minutes(10), now);
        let idle = Station::new(2, 20, true, Size::Any, "");
        let mgr = manager(vec![busy, idle]);

        let deadline = now + Duration::minutes(60);
        let got = mgr
            .find_and_assign("Reine", Size::G, 5, Duration::minutes(10), deadline, now)
            .unwrap();
        assert_eq!(got.station_id, 2);
        assert_eq!(got.end, now + Duration::minutes(10));
    }

    #[test]
    fn ties_break_toward_lower_station_id() {
        let now = Local::now();
        let a = Station::new(1, 20, true, Size::Any, "");
        let b = Station::new(2, 20, true, Size::Any, "");
        let mgr = manager(vec![a, b]);

        let deadline = now + Duration::minutes(60);
        let got = mgr
            .find_and_assign("Reine", Size::G, 5, Duration::minutes(10), deadline, now)
            .unwrap();
        assert_eq!(got.station_id, 1);
    }

    #[test]
    fn housekeeping_runs_before_every_attempt() {
        let now = Local::now();
        let mut s = Station::new(1, 10, true, Size::Any, "");
        s.assign("Reine", Size::G, 10, Duration::minutes(10), now);
        let mgr = manager(vec![s]);

        let later = now + Duration::minutes(11);
        let deadline = later + Duration::minutes(30);
        let got = mgr.find_and_assign("Reine", Size::G, 10, Duration::minutes(10), deadline, later);
        assert!(got.is_some());
    }
}
