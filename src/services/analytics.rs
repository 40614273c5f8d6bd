use serde::Serialize;

use crate::models::{Booking, Car, DateRange};
use crate::services::{
    availability::find_available,
    metrics::{
        booking_trends, bookings_starting_in, car_utilization, monthly_revenue, revenue_by_car,
        status_distribution, summarize, AnalyticsSummary, BookingTrend, CarRevenue,
        CarUtilization, MonthlyRevenue, RevenueBasis, StatusCount,
    },
    periods::month_buckets,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub from: chrono::NaiveDate,
    pub to: chrono::NaiveDate,
    pub revenue_basis: RevenueBasis,
    pub summary: AnalyticsSummary,
    /// Listed cars with no blocking booking anywhere in the window.
    pub available_cars: i64,
    pub revenue_by_month: Vec<MonthlyRevenue>,
    pub bookings_by_status: Vec<StatusCount>,
    pub car_utilization: Vec<CarUtilization>,
    pub revenue_by_car: Vec<CarRevenue>,
    pub booking_trends: Vec<BookingTrend>,
}

/// Builds the analytics dashboard for `range` from a snapshot of the fleet
/// and its bookings. Nothing is retained between calls.
pub fn build_report(
    bookings: &[Booking],
    cars: &[Car],
    range: DateRange,
    basis: RevenueBasis,
) -> Report {
    let buckets = month_buckets(range);
    let current = bookings_starting_in(bookings, range);

    Report {
        from: range.from,
        to: range.to,
        revenue_basis: basis,
        summary: summarize(bookings, range, basis),
        available_cars: find_available(cars, bookings, range, None).len() as i64,
        revenue_by_month: monthly_revenue(&current, &buckets, basis),
        bookings_by_status: status_distribution(&current),
        car_utilization: car_utilization(cars, bookings, range),
        revenue_by_car: revenue_by_car(cars, bookings),
        booking_trends: booking_trends(bookings, &buckets),
    }
}
