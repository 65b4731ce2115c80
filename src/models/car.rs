use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Car {
    pub id: String,
    pub owner_id: String,
    pub location_id: Option<String>,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub category: String,
    pub transmission: String,
    pub fuel_type: String,
    pub seats: i32,
    pub daily_rate: f64,
    pub description: Option<String>,
    pub features: Vec<String>,
    pub main_image_url: Option<String>,
    pub is_available: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarImage {
    pub id: String,
    pub car_id: String,
    pub image_url: String,
    pub is_primary: bool,
}

/// Search filters for the fleet listing. Unavailable cars are hidden unless
/// the caller opts in (an owner reviewing a parked listing).
#[derive(Debug, Clone, Default)]
pub struct CarFilters {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub category: Option<String>,
    pub transmission: Option<String>,
    pub fuel_type: Option<String>,
    pub seats: Option<i32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub location_id: Option<String>,
    pub include_unavailable: bool,
}
