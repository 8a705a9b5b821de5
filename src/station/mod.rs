use chrono::{DateTime, Duration, Local};

/// Size restriction on a pizza or a station.
///
/// `Any` covers both the empty-string and `"-"` wire encodings; callers
/// parsing the authoritative store or the CSV wire format collapse both
/// into this variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Size {
    Any,
    G,
    M,
}

impl Size {
    pub fn parse(raw: &str) -> Size {
        match raw.trim() {
            "G" => Size::G,
            "M" => Size::M,
            _ => Size::Any,
        }
    }

    /// True if a pizza of `requested` size may be produced at a station
    /// whose `supported_size` is `self`.
    pub fn accepts(&self, requested: Size) -> bool {
        matches!(self, Size::Any) || *self == requested
    }

    /// Wire/column encoding, the inverse of [`Size::parse`].
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            Size::Any => "",
            Size::G => "G",
            Size::M => "M",
        }
    }
}

/// A committed unit of work on a station.
///
/// `end` is exclusive: a task occupies capacity for every instant in
/// `[start, end)`.
#[derive(Clone, Debug)]
pub struct Task {
    pub quantity: u32,
    pub start: DateTime<Local>,
    pub end: DateTime<Local>,
    pub pizza_name: String,
    pub pizza_size: Size,
}

/// A bounded-capacity parallel production unit.
///
/// `available` and `restrictions` are fixed at load time. `planning` is
/// the only field that changes after construction, and only through
/// [`Station::assign`] and [`Station::housekeep`].
#[derive(Clone, Debug)]
pub struct Station {
    pub id: i64,
    pub max_capacity: u32,
    pub available: bool,
    pub supported_size: Size,
    pub restrictions: Vec<String>,
    planning: Vec<Task>,
}

impl Station {
    pub fn new(
        id: i64,
        max_capacity: u32,
        available: bool,
        supported_size: Size,
        restrictions_raw: &str,
    ) -> Self {
        let restrictions = restrictions_raw
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != "---")
            .map(|s| s.to_string())
            .collect();

        Self {
            id,
            max_capacity,
            available,
            supported_size,
            restrictions,
            planning: Vec::new(),
        }
    }

    pub fn planning(&self) -> &[Task] {
        &self.planning
    }

    /// Sum of quantities of tasks whose interval contains `t`.
    ///
    /// Start is inclusive, end is exclusive: a task that ends exactly at
    /// `t` no longer contributes.
    pub fn load_at(&self, t: DateTime<Local>) -> u32 {
        self.planning
            .iter()
            .filter(|task| task.start <= t && t < task.end)
            .map(|task| task.quantity)
            .sum()
    }

    /// True iff placing `qty` additional units over `[start, end)` never
    /// pushes load above `max_capacity` at any instant in that interval.
    ///
    /// Load is piecewise-constant and only changes at task starts, so it
    /// suffices to test load at `start` itself and at every committed
    /// task-start strictly inside `(start, end)`.
    pub fn check_interval(&self, start: DateTime<Local>, end: DateTime<Local>, qty: u32) -> bool {
        if self.load_at(start) + qty > self.max_capacity {
            return false;
        }
        for task in &self.planning {
            if task.start > start && task.start < end && self.load_at(task.start) + qty > self.max_capacity {
                return false;
            }
        }
        true
    }

    /// Earliest instant at which a new task of `(qty, duration)` can be
    /// placed without ever violating capacity, or `None` if this station
    /// cannot take the order at all.
    pub fn earliest_start(
        &self,
        pizza_name: &str,
        pizza_size: Size,
        qty: u32,
        duration: Duration,
        now: DateTime<Local>,
    ) -> Option<DateTime<Local>> {
        if !self.available
            || self.restrictions.iter().any(|r| r == pizza_name)
            || !self.supported_size.accepts(pizza_size)
            || qty > self.max_capacity
        {
            return None;
        }

        let mut candidates: Vec<DateTime<Local>> = vec![now];
        candidates.extend(self.planning.iter().filter(|t| t.end > now).map(|t| t.end));
        candidates.sort();
        candidates.dedup();

        for c in candidates {
            let start = if c == now { c } else { c + Duration::seconds(1) };
            let end = start + duration;
            if self.check_interval(start, end, qty) {
                return Some(start);
            }
        }
        None
    }

    /// Commits a task. Caller must have already verified `check_interval`
    /// over `[start, start + duration)` holds.
    pub fn assign(
        &mut self,
        pizza_name: &str,
        pizza_size: Size,
        qty: u32,
        duration: Duration,
        start: DateTime<Local>,
    ) -> DateTime<Local> {
        let end = start + duration;
        self.planning.push(Task {
            quantity: qty,
            start,
            end,
            pizza_name: pizza_name.to_string(),
            pizza_size,
        });
        end
    }

    /// Drops tasks that have fully completed as of `now`, bounding
    /// `planning`'s length by the in-flight horizon.
    pub fn housekeep(&mut self, now: DateTime<Local>) {
        self.planning.retain(|t| t.end > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(now: DateTime<Local>) -> Station {
        let mut s = Station::new(1, 20, true, Size::Any, "");
        s.assign("Reine", Size::G, 5, Duration::minutes(10), now);
        s
    }

    #[test]
    fn load_at_is_zero_before_any_task() {
        let now = Local::now();
        let s = Station::new(1, 20, true, Size::Any, "");
        assert_eq!(s.load_at(now), 0);
    }

    #[test]
    fn load_at_counts_overlapping_task() {
        let now = Local::now();
        let s = base(now);
        assert_eq!(s.load_at(now), 5);
        assert_eq!(s.load_at(now + Duration::minutes(5)), 5);
    }

    #[test]
    fn load_at_excludes_exact_end_boundary() {
        let now = Local::now();
        let s = base(now);
        assert_eq!(s.load_at(now + Duration::minutes(10)), 0);
    }

    #[test]
    fn check_interval_rejects_when_over_capacity() {
        let now = Local::now();
        let s = base(now);
        assert!(!s.check_interval(now, now + Duration::minutes(5), 16));
        assert!(s.check_interval(now, now + Duration::minutes(5), 15));
    }

    #[test]
    fn check_interval_tests_boundaries_inside_new_interval() {
        let now = Local::now();
        let mut s = Station::new(1, 10, true, Size::Any, "");
        s.assign("Reine", Size::G, 5, Duration::minutes(10), now + Duration::minutes(5));
        assert!(!s.check_interval(now, now + Duration::minutes(20), 6));
        assert!(s.check_interval(now, now + Duration::minutes(20), 5));
    }

    #[test]
    fn earliest_start_rejects_unavailable_station() {
        let now = Local::now();
        let s = Station::new(1, 20, false, Size::Any, "");
        assert!(s.earliest_start("Reine", Size::G, 1, Duration::minutes(10), now).is_none());
    }

    #[test]
    fn earliest_start_rejects_restricted_pizza() {
        let now = Local::now();
        let s = Station::new(1, 20, true, Size::Any, "Reine,Veggie");
        assert!(s.earliest_start("Reine", Size::G, 1, Duration::minutes(10), now).is_none());
    }

    #[test]
    fn earliest_start_rejects_size_mismatch() {
        let now = Local::now();
        let s = Station::new(1, 20, true, Size::G, "");
        assert!(s.earliest_start("Reine", Size::M, 1, Duration::minutes(10), now).is_none());
    }

    #[test]
    fn earliest_start_rejects_quantity_over_capacity() {
        let now = Local::now();
        let s = Station::new(1, 10, true, Size::Any, "");
        assert!(s.earliest_start("Reine", Size::G, 11, Duration::minutes(10), now).is_none());
    }

    #[test]
    fn earliest_start_is_now_on_empty_station() {
        let now = Local::now();
        let s = Station::new(1, 20, true, Size::Any, "");
        let start = s.earliest_start("Reine", Size::G, 5, Duration::minutes(10), now).unwrap();
        assert_eq!(start, now);
    }

    #[test]
    fn earliest_start_finds_candidate_after_a_busy_window() {
        let now = Local::now();
        let mut s = Station::new(1, 20, true, Size::Any, "");
        s.assign("Reine", Size::G, 15, Duration::minutes(10), now);
        let start = s.earliest_start("Reine", Size::G, 15, Duration::minutes(10), now).unwrap();
        assert_eq!(start, now + Duration::minutes(10) + Duration::seconds(1));
    }

    #[test]
    fn restrictions_parse_strips_empty_and_dash_tokens() {
        let s = Station::new(1, 20, true, Size::Any, "Reine,,---,Veggie");
        assert_eq!(s.restrictions, vec!["Reine".to_string(), "Veggie".to_string()]);
    }

    #[test]
    fn size_any_accepts_both_blank_and_dash_encodings() {
        assert_eq!(Size::parse(""), Size::Any);
        assert_eq!(Size::parse("-"), Size::Any);
        assert!(Size::Any.accepts(Size::G));
        assert!(Size::Any.accepts(Size::M));
    }

    #[test]
    fn housekeep_drops_completed_tasks_only() {
        let now = Local::now();
        let mut s = base(now);
        s.housekeep(now + Duration::minutes(10));
        assert_eq!(s.planning().len(), 0);
    }

    #[test]
    fn housekeep_keeps_in_flight_tasks() {
        let now = Local::now();
        let mut s = base(now);
        s.housekeep(now + Duration::minutes(5));
        assert_eq!(s.planning().len(), 1);
    }
}
