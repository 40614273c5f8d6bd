use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus, Car, DateRange};
use crate::services::periods::{comparison_period, MonthBucket};

/// Which bookings count as revenue in the summary and monthly series.
/// Per-car revenue always uses `Realized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevenueBasis {
    /// Confirmed and completed bookings.
    Realized,
    /// Every booking that is not cancelled, pending included.
    Booked,
}

impl RevenueBasis {
    pub fn from_config(value: Option<&str>) -> Self {
        match value
            .map(str::trim)
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "booked" => Self::Booked,
            _ => Self::Realized,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Realized => "realized",
            Self::Booked => "booked",
        }
    }

    pub fn counts(self, status: BookingStatus) -> bool {
        match self {
            Self::Realized => status.is_realized(),
            Self::Booked => status.blocks_availability(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsSummary {
    pub total_revenue: f64,
    pub total_bookings: i64,
    pub active_bookings: i64,
    pub pending_bookings: i64,
    pub average_booking_value: f64,
    pub revenue_change: i64,
    pub bookings_change: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusCount {
    pub name: String,
    pub value: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarUtilization {
    pub name: String,
    pub car_id: String,
    pub utilization: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarRevenue {
    pub car_id: String,
    pub car_name: String,
    pub revenue: f64,
    pub bookings: i64,
    pub average_booking_value: f64,
    /// Share of all bookings that went to this car, in percent. Not a time
    /// utilization figure.
    pub utilization: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingTrend {
    pub month: String,
    pub total_bookings: i64,
    pub pending: i64,
    pub confirmed: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub cancellation_rate: i64,
}

/// Bookings whose start date falls inside `range`.
pub fn bookings_starting_in(bookings: &[Booking], range: DateRange) -> Vec<&Booking> {
    bookings
        .iter()
        .filter(|booking| range.contains(booking.start_date))
        .collect()
}

pub fn revenue_total<'a>(
    bookings: impl IntoIterator<Item = &'a Booking>,
    basis: RevenueBasis,
) -> f64 {
    round2(
        bookings
            .into_iter()
            .filter(|booking| basis.counts(booking.status))
            .fold(0.0, |sum, booking| sum + booking.total_price),
    )
}

/// Whole-percent change from `previous` to `current`. A zero baseline reports
/// 100 regardless of `current`.
pub fn percent_change(current: f64, previous: f64) -> i64 {
    if previous == 0.0 {
        return 100;
    }
    round_half_up((current - previous) / previous * 100.0) as i64
}

pub fn summarize(bookings: &[Booking], range: DateRange, basis: RevenueBasis) -> AnalyticsSummary {
    let current = bookings_starting_in(bookings, range);
    let previous = bookings_starting_in(bookings, comparison_period(range));

    let total_revenue = revenue_total(current.iter().copied(), basis);
    let previous_revenue = revenue_total(previous.iter().copied(), basis);
    let total_bookings = current.len() as i64;

    let average_booking_value = if total_bookings == 0 {
        0.0
    } else {
        round_half_up(total_revenue / total_bookings as f64)
    };

    AnalyticsSummary {
        total_revenue,
        total_bookings,
        active_bookings: count_status(&current, BookingStatus::Confirmed),
        pending_bookings: count_status(&current, BookingStatus::Pending),
        average_booking_value,
        revenue_change: percent_change(total_revenue, previous_revenue),
        bookings_change: percent_change(total_bookings as f64, previous.len() as f64),
    }
}

/// Counts per status in the fixed order Pending, Confirmed, Completed,
/// Cancelled; absent statuses report zero.
pub fn status_distribution(bookings: &[&Booking]) -> Vec<StatusCount> {
    BookingStatus::ALL
        .iter()
        .map(|status| StatusCount {
            name: status.label().to_string(),
            value: count_status(bookings, *status),
        })
        .collect()
}

/// Percentage of the days in `range` each car spent under a confirmed or
/// completed booking, with stays clipped to the range.
pub fn car_utilization(cars: &[Car], bookings: &[Booking], range: DateRange) -> Vec<CarUtilization> {
    let days_in_range = range.day_count();

    cars.iter()
        .map(|car| {
            let booked_days: i64 = bookings
                .iter()
                .filter(|booking| booking.car_id == car.id && booking.status.is_realized())
                .map(|booking| {
                    let overlap_start = booking.start_date.max(range.from);
                    let overlap_end = booking.end_date.min(range.to);
                    ((overlap_end - overlap_start).num_days() + 1).max(0)
                })
                .sum();

            let utilization = if days_in_range <= 0 {
                0
            } else {
                round_half_up(booked_days as f64 / days_in_range as f64 * 100.0) as i64
            };

            CarUtilization {
                name: car.display_name(),
                car_id: car.id.clone(),
                utilization,
            }
        })
        .collect()
}

/// Realized revenue per car over every booking passed in, highest first.
/// Cars without bookings are left out.
pub fn revenue_by_car(cars: &[Car], bookings: &[Booking]) -> Vec<CarRevenue> {
    let all_bookings = bookings.len() as f64;

    let mut rows = cars
        .iter()
        .filter_map(|car| {
            let car_bookings = bookings
                .iter()
                .filter(|booking| booking.car_id == car.id)
                .collect::<Vec<_>>();
            if car_bookings.is_empty() {
                return None;
            }

            let realized = car_bookings
                .iter()
                .filter(|booking| booking.status.is_realized())
                .count();
            let revenue = revenue_total(car_bookings.iter().copied(), RevenueBasis::Realized);
            let average_booking_value = if realized == 0 {
                0.0
            } else {
                round_half_up(revenue / realized as f64)
            };
            let utilization = if all_bookings == 0.0 {
                0
            } else {
                round_half_up(car_bookings.len() as f64 / all_bookings * 100.0) as i64
            };

            Some(CarRevenue {
                car_id: car.id.clone(),
                car_name: car.display_name(),
                revenue,
                bookings: car_bookings.len() as i64,
                average_booking_value,
                utilization,
            })
        })
        .collect::<Vec<_>>();

    rows.sort_by(|left, right| right.revenue.total_cmp(&left.revenue));
    rows
}

/// Revenue per month bucket. Callers pass only bookings inside the report
/// window so the series adds up to the summary total.
pub fn monthly_revenue(
    bookings: &[&Booking],
    buckets: &[MonthBucket],
    basis: RevenueBasis,
) -> Vec<MonthlyRevenue> {
    buckets
        .iter()
        .map(|bucket| MonthlyRevenue {
            month: bucket.label.clone(),
            revenue: revenue_total(
                bookings
                    .iter()
                    .copied()
                    .filter(|booking| bucket.contains(booking.start_date)),
                basis,
            ),
        })
        .collect()
}

pub fn booking_trends(bookings: &[Booking], buckets: &[MonthBucket]) -> Vec<BookingTrend> {
    buckets
        .iter()
        .map(|bucket| {
            let in_month = bookings
                .iter()
                .filter(|booking| bucket.contains(booking.start_date))
                .collect::<Vec<_>>();
            let total_bookings = in_month.len() as i64;
            let cancelled = count_status(&in_month, BookingStatus::Cancelled);
            let cancellation_rate = if total_bookings == 0 {
                0
            } else {
                round_half_up(cancelled as f64 / total_bookings as f64 * 100.0) as i64
            };

            BookingTrend {
                month: bucket.label.clone(),
                total_bookings,
                pending: count_status(&in_month, BookingStatus::Pending),
                confirmed: count_status(&in_month, BookingStatus::Confirmed),
                completed: count_status(&in_month, BookingStatus::Completed),
                cancelled,
                cancellation_rate,
            }
        })
        .collect()
}

fn count_status(bookings: &[&Booking], status: BookingStatus) -> i64 {
    bookings
        .iter()
        .filter(|booking| booking.status == status)
        .count() as i64
}

/// Rounds halves toward positive infinity, so -2.5 becomes -2.
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
