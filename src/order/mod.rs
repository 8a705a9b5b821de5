use chrono::{DateTime, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};
use thiserror::Error;

use crate::station::Size;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OrderParseError {
    #[error("expected 6 CSV fields, got {0}")]
    WrongFieldCount(usize),

    #[error("bad deadline format")]
    BadDeadlineFormat,

    #[error("bad quantity")]
    BadQuantity,
}

/// A single streamed order, parsed from its six-field CSV wire record.
///
/// Lives for the duration of one batch cycle; nothing here is retained
/// past the flush that either admits or refuses it.
#[derive(Clone, Debug)]
pub struct Order {
    pub timestamp: DateTime<Local>,
    pub client_id: i64,
    pub pizza_name: String,
    pub pizza_size: Size,
    pub quantity: u32,
    delivery_clock_time: NaiveTime,
}

impl Order {
    /// Parses `dd/MM/yyyy HH:mm:ss,<clientId>,<pizzaName>,<pizzaSize>,<quantity>,<HH:mm>`.
    ///
    /// An unparseable first field (the order timestamp) is not fatal: the
    /// record substitutes `now` and continues, per the engine's tolerance
    /// for a malformed timestamp while still enforcing the delivery
    /// clock-time field strictly.
    pub fn parse(line: &str, now: DateTime<Local>) -> Result<Order, OrderParseError> {
        let fields: Vec<&str> = line.trim().split(',').collect();
        if fields.len() != 6 {
            return Err(OrderParseError::WrongFieldCount(fields.len()));
        }

        let timestamp = NaiveDateTime::parse_from_str(fields[0], "%d/%m/%Y %H:%M:%S")
            .ok()
            .and_then(|naive| Local.from_local_datetime(&naive).single())
            .unwrap_or(now);

        let client_id: i64 = fields[1].trim().parse().map_err(|_| OrderParseError::BadQuantity)?;
        let pizza_name = fields[2].trim().to_string();
        let pizza_size = Size::parse(fields[3]);
        let quantity: u32 = fields[4].trim().parse().map_err(|_| OrderParseError::BadQuantity)?;

        let delivery_clock_time = parse_clock_time(fields[5])?;

        Ok(Order {
            timestamp,
            client_id,
            pizza_name,
            pizza_size,
            quantity,
            delivery_clock_time,
        })
    }

    /// The absolute delivery instant: today's date at the parsed
    /// `HH:MM:00`, rolled forward one day if that candidate already
    /// precedes the order's own timestamp (past-midnight wrap).
    pub fn delivery_deadline(&self) -> DateTime<Local> {
        let candidate_naive = NaiveDateTime::new(self.timestamp.date_naive(), self.delivery_clock_time);
        let mut candidate = Local.from_local_datetime(&candidate_naive).single().unwrap_or(self.timestamp);
        if candidate < self.timestamp {
            candidate += Duration::days(1);
        }
        candidate
    }

    /// Time remaining between the order's timestamp and its delivery
    /// deadline; used only for intra-batch LSTF ordering.
    pub fn time_available(&self) -> Duration {
        self.delivery_deadline() - self.timestamp
    }
}

fn parse_clock_time(raw: &str) -> Result<NaiveTime, OrderParseError> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() != 2 {
        return Err(OrderParseError::BadDeadlineFormat);
    }
    let hour: u32 = parts[0].parse().map_err(|_| OrderParseError::BadDeadlineFormat)?;
    let minute: u32 = parts[1].parse().map_err(|_| OrderParseError::BadDeadlineFormat)?;
    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(OrderParseError::BadDeadlineFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, h, mi, s).unwrap()
    }

    #[test]
    fn parses_a_well_formed_record() {
        let now = at(2025, 11, 26, 10, 3, 12);
        let o = Order::parse("26/11/2025 10:03:12,530080,Reine,G,3,11:30", now).unwrap();
        assert_eq!(o.client_id, 530080);
        assert_eq!(o.pizza_name, "Reine");
        assert_eq!(o.pizza_size, Size::G);
        assert_eq!(o.quantity, 3);
        assert_eq!(o.timestamp, at(2025, 11, 26, 10, 3, 12));
    }

    #[test]
    fn wrong_field_count_is_rejected() {
        let now = at(2025, 1, 1, 0, 0, 0);
        let err = Order::parse("a,b,c", now).unwrap_err();
        assert_eq!(err, OrderParseError::WrongFieldCount(3));
    }

    #[test]
    fn bad_deadline_format_is_rejected() {
        let now = at(2025, 1, 1, 0, 0, 0);
        let err = Order::parse("26/11/2025 10:03:12,530080,Reine,G,3,nope", now).unwrap_err();
        assert_eq!(err, OrderParseError::BadDeadlineFormat);
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let now = at(2025, 11, 26, 10, 3, 12);
        let o = Order::parse("not-a-date,530080,Reine,G,3,11:30", now).unwrap();
        assert_eq!(o.timestamp, now);
    }

    #[test]
    fn deadline_same_day_when_clock_time_is_later() {
        let now = at(2025, 11, 26, 10, 0, 0);
        let o = Order::parse("26/11/2025 10:00:00,1,Reine,G,1,11:30", now).unwrap();
        assert_eq!(o.delivery_deadline(), at(2025, 11, 26, 11, 30, 0));
    }

    #[test]
    fn deadline_wraps_past_midnight_when_clock_time_already_elapsed() {
        let now = at(2025, 11, 26, 23, 50, 0);
        let o = Order::parse("26/11/2025 23:50:00,1,Reine,G,1,00:10", now).unwrap();
        assert_eq!(o.delivery_deadline(), at(2025, 11, 27, 0, 10, 0));
    }

    #[test]
    fn time_available_matches_the_gap_to_deadline() {
        let now = at(2025, 11, 26, 10, 0, 0);
        let o = Order::parse("26/11/2025 10:00:00,1,Reine,G,1,11:30", now).unwrap();
        assert_eq!(o.time_available(), Duration::minutes(90));
    }
}
