use std::ops::RangeInclusive;

use thiserror::Error;

use crate::models::{Dome, SeatKey};
use crate::store::{ReservationTx, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BoundsError {
    #[error("row number must be in available range: (1, {max}), got {value}")]
    RowOutOfRange { value: i32, max: i32 },

    #[error("seat number must be in available range: (1, {max}), got {value}")]
    SeatOutOfRange { value: i32, max: i32 },
}

impl BoundsError {
    pub fn field(&self) -> &'static str {
        match self {
            Self::RowOutOfRange { .. } => "row",
            Self::SeatOutOfRange { .. } => "seat",
        }
    }

    /// The inclusive range the offending value had to fall in.
    pub fn range(&self) -> RangeInclusive<i32> {
        match *self {
            Self::RowOutOfRange { max, .. } | Self::SeatOutOfRange { max, .. } => 1..=max,
        }
    }
}

/// Checks `row` then `seat` against the dome, failing on the first violation.
pub fn validate(row: i32, seat: i32, dome: &Dome) -> Result<(), BoundsError> {
    match violations(row, seat, dome).next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Every bounds violation of `(row, seat)`, row first.
pub fn violations(row: i32, seat: i32, dome: &Dome) -> impl Iterator<Item = BoundsError> {
    let row_err = (!(1..=dome.rows).contains(&row)).then_some(BoundsError::RowOutOfRange {
        value: row,
        max: dome.rows,
    });
    let seat_err = (!(1..=dome.seats_in_row).contains(&seat)).then_some(
        BoundsError::SeatOutOfRange {
            value: seat,
            max: dome.seats_in_row,
        },
    );
    row_err.into_iter().chain(seat_err)
}

/// Whether a committed ticket already holds `seat`. Must run in the transaction
/// that will insert the ticket.
pub async fn is_taken<T: ReservationTx>(tx: &mut T, seat: SeatKey) -> Result<bool, StoreError> {
    tx.is_taken(seat).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dome(rows: i32, seats_in_row: i32) -> Dome {
        Dome {
            id: 1,
            name: "Main Dome".to_string(),
            rows,
            seats_in_row,
        }
    }

    #[test]
    fn accepts_corners() {
        let d = dome(10, 12);
        assert_eq!(validate(1, 1, &d), Ok(()));
        assert_eq!(validate(10, 12, &d), Ok(()));
    }

    #[test]
    fn row_past_last_row() {
        let err = validate(11, 1, &dome(10, 10)).unwrap_err();
        assert_eq!(err, BoundsError::RowOutOfRange { value: 11, max: 10 });
        assert_eq!(err.field(), "row");
        assert_eq!(err.range(), 1..=10);
    }

    #[test]
    fn zero_and_negative_seat() {
        let d = dome(5, 8);
        assert_eq!(
            validate(2, 0, &d),
            Err(BoundsError::SeatOutOfRange { value: 0, max: 8 })
        );
        assert_eq!(validate(2, -3, &d).unwrap_err().field(), "seat");
    }

    #[test]
    fn reports_both_fields() {
        let errs: Vec<_> = violations(0, 99, &dome(5, 8)).collect();
        assert_eq!(errs.len(), 2);
        assert_eq!(errs[0].field(), "row");
        assert_eq!(errs[1].field(), "seat");
    }

    proptest! {
        #[test]
        fn prop_valid_iff_within_bounds(
            rows in 1i32..200,
            seats in 1i32..200,
            row in -5i32..210,
            seat in -5i32..210,
        ) {
            let d = dome(rows, seats);
            let inside = (1..=rows).contains(&row) && (1..=seats).contains(&seat);
            prop_assert_eq!(validate(row, seat, &d).is_ok(), inside);
            prop_assert_eq!(violations(row, seat, &d).next().is_none(), inside);
        }
    }
}
