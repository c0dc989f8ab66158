use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// A physical venue. Valid seat coordinates are `[1..=rows] x [1..=seats_in_row]`.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Dome {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl Dome {
    pub fn capacity(&self) -> i64 {
        i64::from(self.rows) * i64::from(self.seats_in_row)
    }

    pub fn same_geometry(&self, rows: i32, seats_in_row: i32) -> bool {
        self.rows == rows && self.seats_in_row == seats_in_row
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DomePayload {
    #[validate(length(min = 1, max = 255, message = "must be between 1 and 255 characters"))]
    pub name: String,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub rows: i32,
    #[validate(range(min = 1, message = "must be a positive integer"))]
    pub seats_in_row: i32,
}
