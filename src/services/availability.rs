use chrono::NaiveDate;

use crate::models::{Booking, Car, DateRange};

/// Closed-interval overlap. Bookings that touch on a single day collide:
/// a car returned on the 15th cannot be picked up by someone else that day.
pub fn overlaps(
    candidate_start: NaiveDate,
    candidate_end: NaiveDate,
    existing_start: NaiveDate,
    existing_end: NaiveDate,
) -> bool {
    existing_start <= candidate_end && existing_end >= candidate_start
}

/// True when no non-cancelled booking for `car_id` overlaps `range`.
/// `ignore_booking_id` lets an edited booking skip its own dates.
pub fn is_car_free(
    car_id: &str,
    bookings: &[Booking],
    range: DateRange,
    ignore_booking_id: Option<&str>,
) -> bool {
    !bookings.iter().any(|booking| {
        booking.car_id == car_id
            && booking.status.blocks_availability()
            && ignore_booking_id != Some(booking.id.as_str())
            && overlaps(range.from, range.to, booking.start_date, booking.end_date)
    })
}

/// Listed cars, optionally at one location, with no blocking booking in
/// `range`. Input order is preserved.
pub fn find_available(
    cars: &[Car],
    bookings: &[Booking],
    range: DateRange,
    location_id: Option<&str>,
) -> Vec<Car> {
    cars.iter()
        .filter(|car| car.available)
        .filter(|car| match location_id {
            Some(wanted) => car.location_id.as_deref() == Some(wanted),
            None => true,
        })
        .filter(|car| is_car_free(&car.id, bookings, range, None))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};

    use super::{find_available, is_car_free, overlaps};
    use crate::models::{Booking, BookingStatus, Car, DateRange};

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").unwrap()
    }

    fn car(id: &str, listed: bool, location: Option<&str>) -> Car {
        Car {
            id: id.to_string(),
            make: "Toyota".to_string(),
            model: "Corolla".to_string(),
            year: 2022,
            transmission: "Automatic".to_string(),
            fuel_type: "Gasoline".to_string(),
            seats: 5,
            price_per_day: 50.0,
            available: listed,
            image: None,
            description: None,
            location_id: location.map(ToOwned::to_owned),
            popularity: None,
        }
    }

    fn booking(car_id: &str, start: &str, end: &str, status: BookingStatus) -> Booking {
        Booking {
            id: format!("b-{car_id}-{start}"),
            car_id: car_id.to_string(),
            customer_id: None,
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone: "555-0100".to_string(),
            start_date: date(start),
            end_date: date(end),
            total_price: 100.0,
            status,
            created_at: Utc::now(),
            cancel_reason: None,
            location_id: None,
        }
    }

    fn three_clause(cs: NaiveDate, ce: NaiveDate, es: NaiveDate, ee: NaiveDate) -> bool {
        let within = |d: NaiveDate| d >= cs && d <= ce;
        within(es) || within(ee) || (es <= cs && ee >= ce)
    }

    #[test]
    fn touching_intervals_overlap() {
        let a = date("2024-06-10");
        let b = date("2024-06-15");
        let c = date("2024-06-20");
        assert!(overlaps(b, c, a, b));
        assert!(overlaps(a, b, b, c));
    }

    #[test]
    fn reduced_form_matches_three_clause_form() {
        let base = date("2024-01-01");
        let day = |n: i64| base + Duration::days(n);
        for cs in 0..8 {
            for ce in cs..8 {
                for es in 0..8 {
                    for ee in es..8 {
                        assert_eq!(
                            overlaps(day(cs), day(ce), day(es), day(ee)),
                            three_clause(day(cs), day(ce), day(es), day(ee)),
                            "candidate {cs}..{ce} existing {es}..{ee}"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn basic_availability_scenario() {
        let cars = vec![car("R1", true, Some("L1"))];
        let bookings = vec![booking(
            "R1",
            "2024-06-10",
            "2024-06-15",
            BookingStatus::Confirmed,
        )];

        let clashing = DateRange::new(date("2024-06-12"), date("2024-06-20"));
        assert!(find_available(&cars, &bookings, clashing, Some("L1")).is_empty());

        let after = DateRange::new(date("2024-06-16"), date("2024-06-20"));
        let found = find_available(&cars, &bookings, after, Some("L1"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "R1");
    }

    #[test]
    fn pending_blocks_but_cancelled_does_not() {
        let range = DateRange::new(date("2024-06-01"), date("2024-06-05"));
        let pending = vec![booking("R1", "2024-06-03", "2024-06-04", BookingStatus::Pending)];
        let cancelled = vec![booking(
            "R1",
            "2024-06-03",
            "2024-06-04",
            BookingStatus::Cancelled,
        )];
        assert!(!is_car_free("R1", &pending, range, None));
        assert!(is_car_free("R1", &cancelled, range, None));
    }

    #[test]
    fn ignored_booking_does_not_block_itself() {
        let range = DateRange::new(date("2024-06-01"), date("2024-06-05"));
        let bookings = vec![booking("R1", "2024-06-03", "2024-06-04", BookingStatus::Confirmed)];
        let own_id = bookings[0].id.clone();
        assert!(is_car_free("R1", &bookings, range, Some(&own_id)));
    }

    #[test]
    fn filter_respects_listing_location_and_order() {
        let cars = vec![
            car("A", true, Some("L1")),
            car("B", false, Some("L1")),
            car("C", true, Some("L2")),
            car("D", true, Some("L1")),
            car("E", true, None),
        ];
        let bookings = vec![booking("D", "2024-07-01", "2024-07-03", BookingStatus::Pending)];
        let range = DateRange::new(date("2024-07-02"), date("2024-07-04"));

        let at_l1: Vec<String> = find_available(&cars, &bookings, range, Some("L1"))
            .into_iter()
            .map(|car| car.id)
            .collect();
        assert_eq!(at_l1, vec!["A"]);

        let anywhere: Vec<String> = find_available(&cars, &bookings, range, None)
            .into_iter()
            .map(|car| car.id)
            .collect();
        assert_eq!(anywhere, vec!["A", "C", "E"]);
    }

    #[test]
    fn empty_fleet_yields_empty_list() {
        let range = DateRange::new(date("2024-07-02"), date("2024-07-04"));
        assert!(find_available(&[], &[], range, None).is_empty());
    }
}
