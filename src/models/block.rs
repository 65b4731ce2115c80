use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::models::DateRange;

/// Owner-declared unavailability (maintenance, personal use). Blocks have no
/// status machine; while one exists the car cannot be booked over it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarBlock {
    pub id: String,
    pub car_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: NaiveDateTime,
}

impl CarBlock {
    pub fn range(&self) -> DateRange {
        DateRange {
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}
