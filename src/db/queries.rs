use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

use crate::models::{
    Booking, BookingStatus, Car, CarBlock, CarFilters, CarImage, DateRange, Location,
    PaymentStatus, Review, UserProfile,
};

fn ts(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn parse_ts(s: &str) -> anyhow::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| anyhow::anyhow!("bad timestamp {s:?}: {e}"))
}

fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| anyhow::anyhow!("bad date {s:?}: {e}"))
}

// ── Users ──

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<UserProfile>> {
    let result = conn.query_row(
        "SELECT id, email, first_name, last_name, phone, created_at, updated_at
         FROM users WHERE id = ?1",
        params![id],
        |row| Ok(parse_user_row(row)),
    );

    match result {
        Ok(user) => Ok(Some(user?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn save_user(conn: &Connection, user: &UserProfile) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, phone, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(id) DO UPDATE SET
           email = excluded.email,
           first_name = excluded.first_name,
           last_name = excluded.last_name,
           phone = excluded.phone,
           updated_at = excluded.updated_at",
        params![
            user.id,
            user.email,
            user.first_name,
            user.last_name,
            user.phone,
            ts(&user.created_at),
            ts(&user.updated_at),
        ],
    )?;
    Ok(())
}

fn parse_user_row(row: &rusqlite::Row) -> anyhow::Result<UserProfile> {
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(UserProfile {
        id: row.get(0)?,
        email: row.get(1)?,
        first_name: row.get(2)?,
        last_name: row.get(3)?,
        phone: row.get(4)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

// ── Locations ──

pub fn list_locations(conn: &Connection) -> anyhow::Result<Vec<Location>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, address, city, created_at FROM locations ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], |row| Ok(parse_location_row(row)))?;

    let mut locations = vec![];
    for row in rows {
        locations.push(row??);
    }
    Ok(locations)
}

pub fn get_location(conn: &Connection, id: &str) -> anyhow::Result<Option<Location>> {
    let result = conn.query_row(
        "SELECT id, name, address, city, created_at FROM locations WHERE id = ?1",
        params![id],
        |row| Ok(parse_location_row(row)),
    );

    match result {
        Ok(location) => Ok(Some(location?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn create_location(conn: &Connection, location: &Location) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO locations (id, name, address, city, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            location.id,
            location.name,
            location.address,
            location.city,
            ts(&location.created_at),
        ],
    )?;
    Ok(())
}

pub fn update_location(conn: &Connection, location: &Location) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE locations SET name = ?1, address = ?2, city = ?3 WHERE id = ?4",
        params![location.name, location.address, location.city, location.id],
    )?;
    Ok(count > 0)
}

pub fn delete_location(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM locations WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

fn parse_location_row(row: &rusqlite::Row) -> anyhow::Result<Location> {
    let created_at_str: String = row.get(4)?;

    Ok(Location {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        city: row.get(3)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Cars ──

const CAR_COLS: &str = "id, owner_id, location_id, make, model, year, category, transmission, \
                        fuel_type, seats, daily_rate, description, features, main_image_url, \
                        is_available, created_at, updated_at";

pub fn create_car(conn: &Connection, car: &Car) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO cars ({CAR_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            car.id,
            car.owner_id,
            car.location_id,
            car.make,
            car.model,
            car.year,
            car.category,
            car.transmission,
            car.fuel_type,
            car.seats,
            car.daily_rate,
            car.description,
            serde_json::to_string(&car.features)?,
            car.main_image_url,
            car.is_available as i32,
            ts(&car.created_at),
            ts(&car.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_car(conn: &Connection, id: &str) -> anyhow::Result<Option<Car>> {
    let result = conn.query_row(
        &format!("SELECT {CAR_COLS} FROM cars WHERE id = ?1"),
        params![id],
        |row| Ok(parse_car_row(row)),
    );

    match result {
        Ok(car) => Ok(Some(car?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct CarListing {
    pub car: Car,
    pub location_name: Option<String>,
    pub location_city: Option<String>,
}

pub fn list_cars(
    conn: &Connection,
    filters: &CarFilters,
    page: i64,
    limit: i64,
) -> anyhow::Result<(Vec<CarListing>, i64)> {
    let mut clauses: Vec<String> = vec![];
    let mut args: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(make) = &filters.make {
        args.push(Box::new(format!("%{make}%")));
        clauses.push(format!("c.make LIKE ?{}", args.len()));
    }
    if let Some(model) = &filters.model {
        args.push(Box::new(format!("%{model}%")));
        clauses.push(format!("c.model LIKE ?{}", args.len()));
    }
    if let Some(year) = filters.year {
        args.push(Box::new(year));
        clauses.push(format!("c.year = ?{}", args.len()));
    }
    if let Some(category) = &filters.category {
        args.push(Box::new(category.clone()));
        clauses.push(format!("c.category = ?{}", args.len()));
    }
    if let Some(transmission) = &filters.transmission {
        args.push(Box::new(transmission.clone()));
        clauses.push(format!("c.transmission = ?{}", args.len()));
    }
    if let Some(fuel_type) = &filters.fuel_type {
        args.push(Box::new(fuel_type.clone()));
        clauses.push(format!("c.fuel_type = ?{}", args.len()));
    }
    if let Some(seats) = filters.seats {
        args.push(Box::new(seats));
        clauses.push(format!("c.seats = ?{}", args.len()));
    }
    if let Some(min_price) = filters.min_price {
        args.push(Box::new(min_price));
        clauses.push(format!("c.daily_rate >= ?{}", args.len()));
    }
    if let Some(max_price) = filters.max_price {
        args.push(Box::new(max_price));
        clauses.push(format!("c.daily_rate <= ?{}", args.len()));
    }
    if let Some(location_id) = &filters.location_id {
        args.push(Box::new(location_id.clone()));
        clauses.push(format!("c.location_id = ?{}", args.len()));
    }
    if !filters.include_unavailable {
        clauses.push("c.is_available = 1".to_string());
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };

    let count_refs: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|p| p.as_ref()).collect();
    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM cars c{where_sql}"),
        count_refs.as_slice(),
        |row| row.get(0),
    )?;

    args.push(Box::new(limit));
    let limit_pos = args.len();
    args.push(Box::new((page - 1) * limit));
    let offset_pos = args.len();

    let sql = format!(
        "SELECT c.id, c.owner_id, c.location_id, c.make, c.model, c.year, c.category, \
                c.transmission, c.fuel_type, c.seats, c.daily_rate, c.description, c.features, \
                c.main_image_url, c.is_available, c.created_at, c.updated_at, l.name, l.city
         FROM cars c LEFT JOIN locations l ON l.id = c.location_id{where_sql}
         ORDER BY c.created_at DESC LIMIT ?{limit_pos} OFFSET ?{offset_pos}"
    );

    let arg_refs: Vec<&dyn rusqlite::types::ToSql> = args.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(arg_refs.as_slice(), |row| {
        let location_name: Option<String> = row.get(17)?;
        let location_city: Option<String> = row.get(18)?;
        Ok(parse_car_row(row).map(|car| CarListing {
            car,
            location_name,
            location_city,
        }))
    })?;

    let mut listings = vec![];
    for row in rows {
        listings.push(row??);
    }
    Ok((listings, total))
}

pub fn update_car(conn: &Connection, car: &Car) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE cars SET location_id = ?1, make = ?2, model = ?3, year = ?4, category = ?5,
                transmission = ?6, fuel_type = ?7, seats = ?8, daily_rate = ?9, description = ?10,
                features = ?11, main_image_url = ?12, is_available = ?13, updated_at = ?14
         WHERE id = ?15",
        params![
            car.location_id,
            car.make,
            car.model,
            car.year,
            car.category,
            car.transmission,
            car.fuel_type,
            car.seats,
            car.daily_rate,
            car.description,
            serde_json::to_string(&car.features)?,
            car.main_image_url,
            car.is_available as i32,
            ts(&car.updated_at),
            car.id,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_car(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM cars WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_cars_for_location(conn: &Connection, location_id: &str) -> anyhow::Result<Vec<Car>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {CAR_COLS} FROM cars WHERE location_id = ?1 AND is_available = 1
         ORDER BY created_at DESC"
    ))?;
    let rows = stmt.query_map(params![location_id], |row| Ok(parse_car_row(row)))?;

    let mut cars = vec![];
    for row in rows {
        cars.push(row??);
    }
    Ok(cars)
}

pub fn replace_car_images(conn: &Connection, car_id: &str, urls: &[String]) -> anyhow::Result<()> {
    conn.execute("DELETE FROM car_images WHERE car_id = ?1", params![car_id])?;
    for (i, url) in urls.iter().enumerate() {
        conn.execute(
            "INSERT INTO car_images (id, car_id, image_url, is_primary) VALUES (?1, ?2, ?3, ?4)",
            params![
                uuid::Uuid::new_v4().to_string(),
                car_id,
                url,
                (i == 0) as i32,
            ],
        )?;
    }
    Ok(())
}

pub fn get_car_images(conn: &Connection, car_id: &str) -> anyhow::Result<Vec<CarImage>> {
    let mut stmt = conn.prepare(
        "SELECT id, car_id, image_url, is_primary FROM car_images
         WHERE car_id = ?1 ORDER BY is_primary DESC, id ASC",
    )?;
    let rows = stmt.query_map(params![car_id], |row| {
        Ok(CarImage {
            id: row.get(0)?,
            car_id: row.get(1)?,
            image_url: row.get(2)?,
            is_primary: row.get::<_, i32>(3)? != 0,
        })
    })?;

    let mut images = vec![];
    for row in rows {
        images.push(row?);
    }
    Ok(images)
}

fn parse_car_row(row: &rusqlite::Row) -> anyhow::Result<Car> {
    let features_json: String = row.get(12)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    Ok(Car {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        location_id: row.get(2)?,
        make: row.get(3)?,
        model: row.get(4)?,
        year: row.get(5)?,
        category: row.get(6)?,
        transmission: row.get(7)?,
        fuel_type: row.get(8)?,
        seats: row.get(9)?,
        daily_rate: row.get(10)?,
        description: row.get(11)?,
        features: serde_json::from_str(&features_json).unwrap_or_default(),
        main_image_url: row.get(13)?,
        is_available: row.get::<_, i32>(14)? != 0,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

// ── Bookings ──

const BOOKING_COLS: &str = "id, car_id, renter_id, start_date, end_date, pickup_location_id, \
                            return_location_id, status, payment_status, total_price, created_at, \
                            updated_at";

pub fn insert_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
        ),
        params![
            booking.id,
            booking.car_id,
            booking.renter_id,
            booking.start_date.to_string(),
            booking.end_date.to_string(),
            booking.pickup_location_id,
            booking.return_location_id,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.total_price,
            ts(&booking.created_at),
            ts(&booking.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_booking(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct BookingWithCar {
    pub booking: Booking,
    pub car_make: String,
    pub car_model: String,
    pub car_year: i32,
    pub car_image_url: Option<String>,
}

pub fn get_bookings_for_renter(
    conn: &Connection,
    renter_id: &str,
) -> anyhow::Result<Vec<BookingWithCar>> {
    let mut stmt = conn.prepare(
        "SELECT b.id, b.car_id, b.renter_id, b.start_date, b.end_date, b.pickup_location_id,
                b.return_location_id, b.status, b.payment_status, b.total_price, b.created_at,
                b.updated_at, c.make, c.model, c.year, c.main_image_url
         FROM bookings b INNER JOIN cars c ON c.id = b.car_id
         WHERE b.renter_id = ?1 ORDER BY b.created_at DESC",
    )?;
    let rows = stmt.query_map(params![renter_id], |row| {
        let car_make: String = row.get(12)?;
        let car_model: String = row.get(13)?;
        let car_year: i32 = row.get(14)?;
        let car_image_url: Option<String> = row.get(15)?;
        Ok(parse_booking_row(row).map(|booking| BookingWithCar {
            booking,
            car_make,
            car_model,
            car_year,
            car_image_url,
        }))
    })?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    status: BookingStatus,
    updated_at: &NaiveDateTime,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3",
        params![status.as_str(), ts(updated_at), id],
    )?;
    Ok(count > 0)
}

/// Earliest live booking on the car whose inclusive range touches the
/// candidate range. Cancelled and completed rentals never count.
pub fn first_booking_overlapping(
    conn: &Connection,
    car_id: &str,
    range: &DateRange,
) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!(
            "SELECT {BOOKING_COLS} FROM bookings
             WHERE car_id = ?1 AND status IN ('pending', 'confirmed')
               AND start_date <= ?3 AND end_date >= ?2
             ORDER BY start_date ASC LIMIT 1"
        ),
        params![
            car_id,
            range.start_date.to_string(),
            range.end_date.to_string(),
        ],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let start_date_str: String = row.get(3)?;
    let end_date_str: String = row.get(4)?;
    let status_str: String = row.get(7)?;
    let payment_str: String = row.get(8)?;
    let created_at_str: String = row.get(10)?;
    let updated_at_str: String = row.get(11)?;

    Ok(Booking {
        id: row.get(0)?,
        car_id: row.get(1)?,
        renter_id: row.get(2)?,
        start_date: parse_date(&start_date_str)?,
        end_date: parse_date(&end_date_str)?,
        pickup_location_id: row.get(5)?,
        return_location_id: row.get(6)?,
        status: BookingStatus::parse(&status_str),
        payment_status: PaymentStatus::parse(&payment_str),
        total_price: row.get(9)?,
        created_at: parse_ts(&created_at_str)?,
        updated_at: parse_ts(&updated_at_str)?,
    })
}

// ── Availability blocks ──

pub fn insert_block(conn: &Connection, block: &CarBlock) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO car_blocks (id, car_id, start_date, end_date, reason, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            block.id,
            block.car_id,
            block.start_date.to_string(),
            block.end_date.to_string(),
            block.reason,
            ts(&block.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_block(conn: &Connection, id: &str) -> anyhow::Result<Option<CarBlock>> {
    let result = conn.query_row(
        "SELECT id, car_id, start_date, end_date, reason, created_at
         FROM car_blocks WHERE id = ?1",
        params![id],
        |row| Ok(parse_block_row(row)),
    );

    match result {
        Ok(block) => Ok(Some(block?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_blocks_for_car(conn: &Connection, car_id: &str) -> anyhow::Result<Vec<CarBlock>> {
    let mut stmt = conn.prepare(
        "SELECT id, car_id, start_date, end_date, reason, created_at
         FROM car_blocks WHERE car_id = ?1 ORDER BY start_date ASC",
    )?;
    let rows = stmt.query_map(params![car_id], |row| Ok(parse_block_row(row)))?;

    let mut blocks = vec![];
    for row in rows {
        blocks.push(row??);
    }
    Ok(blocks)
}

pub fn delete_block(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM car_blocks WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn first_block_overlapping(
    conn: &Connection,
    car_id: &str,
    range: &DateRange,
) -> anyhow::Result<Option<CarBlock>> {
    let result = conn.query_row(
        "SELECT id, car_id, start_date, end_date, reason, created_at
         FROM car_blocks
         WHERE car_id = ?1 AND start_date <= ?3 AND end_date >= ?2
         ORDER BY start_date ASC LIMIT 1",
        params![
            car_id,
            range.start_date.to_string(),
            range.end_date.to_string(),
        ],
        |row| Ok(parse_block_row(row)),
    );

    match result {
        Ok(block) => Ok(Some(block?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn parse_block_row(row: &rusqlite::Row) -> anyhow::Result<CarBlock> {
    let start_date_str: String = row.get(2)?;
    let end_date_str: String = row.get(3)?;
    let created_at_str: String = row.get(5)?;

    Ok(CarBlock {
        id: row.get(0)?,
        car_id: row.get(1)?,
        start_date: parse_date(&start_date_str)?,
        end_date: parse_date(&end_date_str)?,
        reason: row.get(4)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Reviews ──

pub fn insert_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO reviews (id, booking_id, car_id, author_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            review.id,
            review.booking_id,
            review.car_id,
            review.author_id,
            review.rating,
            review.comment,
            ts(&review.created_at),
        ],
    )?;
    Ok(())
}

pub fn get_review_for_booking(
    conn: &Connection,
    booking_id: &str,
) -> anyhow::Result<Option<Review>> {
    let result = conn.query_row(
        "SELECT id, booking_id, car_id, author_id, rating, comment, created_at
         FROM reviews WHERE booking_id = ?1",
        params![booking_id],
        |row| Ok(parse_review_row(row)),
    );

    match result {
        Ok(review) => Ok(Some(review?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub struct ReviewWithAuthor {
    pub review: Review,
    pub author_name: String,
}

pub fn get_reviews_for_car(conn: &Connection, car_id: &str) -> anyhow::Result<Vec<ReviewWithAuthor>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.booking_id, r.car_id, r.author_id, r.rating, r.comment, r.created_at,
                u.first_name || ' ' || u.last_name
         FROM reviews r INNER JOIN users u ON u.id = r.author_id
         WHERE r.car_id = ?1 ORDER BY r.created_at DESC",
    )?;
    let rows = stmt.query_map(params![car_id], |row| {
        let author_name: String = row.get(7)?;
        Ok(parse_review_row(row).map(|review| ReviewWithAuthor {
            review,
            author_name,
        }))
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row??);
    }
    Ok(reviews)
}

fn parse_review_row(row: &rusqlite::Row) -> anyhow::Result<Review> {
    let created_at_str: String = row.get(6)?;

    Ok(Review {
        id: row.get(0)?,
        booking_id: row.get(1)?,
        car_id: row.get(2)?,
        author_id: row.get(3)?,
        rating: row.get(4)?,
        comment: row.get(5)?,
        created_at: parse_ts(&created_at_str)?,
    })
}

// ── Dashboard ──

pub struct FleetCar {
    pub car: Car,
    pub pending_requests: i64,
    pub active_bookings: i64,
}

pub fn get_fleet_overview(conn: &Connection, owner_id: &str) -> anyhow::Result<Vec<FleetCar>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {cols},
                (SELECT COUNT(*) FROM bookings b WHERE b.car_id = c.id AND b.status = 'pending'),
                (SELECT COUNT(*) FROM bookings b WHERE b.car_id = c.id AND b.status = 'confirmed')
         FROM cars c WHERE c.owner_id = ?1 ORDER BY c.created_at DESC",
        cols = "c.id, c.owner_id, c.location_id, c.make, c.model, c.year, c.category, \
                c.transmission, c.fuel_type, c.seats, c.daily_rate, c.description, c.features, \
                c.main_image_url, c.is_available, c.created_at, c.updated_at"
    ))?;
    let rows = stmt.query_map(params![owner_id], |row| {
        let pending_requests: i64 = row.get(17)?;
        let active_bookings: i64 = row.get(18)?;
        Ok(parse_car_row(row).map(|car| FleetCar {
            car,
            pending_requests,
            active_bookings,
        }))
    })?;

    let mut fleet = vec![];
    for row in rows {
        fleet.push(row??);
    }
    Ok(fleet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Utc;

    fn setup_db() -> Connection {
        db::init_db(":memory:").unwrap()
    }

    fn seed_user(conn: &Connection, id: &str) {
        let now = Utc::now().naive_utc();
        save_user(
            conn,
            &UserProfile {
                id: id.to_string(),
                email: format!("{id}@example.com"),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone: None,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    fn seed_car(conn: &Connection, id: &str, owner_id: &str, make: &str, daily_rate: f64) {
        let now = Utc::now().naive_utc();
        create_car(
            conn,
            &Car {
                id: id.to_string(),
                owner_id: owner_id.to_string(),
                location_id: None,
                make: make.to_string(),
                model: "Test".to_string(),
                year: 2020,
                category: "sedan".to_string(),
                transmission: "automatic".to_string(),
                fuel_type: "petrol".to_string(),
                seats: 5,
                daily_rate,
                description: None,
                features: vec!["bluetooth".to_string()],
                main_image_url: None,
                is_available: true,
                created_at: now,
                updated_at: now,
            },
        )
        .unwrap();
    }

    #[test]
    fn test_car_round_trip_preserves_features() {
        let conn = setup_db();
        seed_user(&conn, "owner-1");
        seed_car(&conn, "car-1", "owner-1", "Toyota", 40.0);

        let car = get_car(&conn, "car-1").unwrap().unwrap();
        assert_eq!(car.make, "Toyota");
        assert_eq!(car.features, vec!["bluetooth".to_string()]);
        assert!(car.is_available);
    }

    #[test]
    fn test_list_cars_filters_by_make_and_price() {
        let conn = setup_db();
        seed_user(&conn, "owner-1");
        seed_car(&conn, "car-1", "owner-1", "Toyota", 40.0);
        seed_car(&conn, "car-2", "owner-1", "BMW", 120.0);

        let filters = CarFilters {
            make: Some("toy".to_string()),
            ..Default::default()
        };
        let (listings, total) = list_cars(&conn, &filters, 1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(listings[0].car.id, "car-1");

        let filters = CarFilters {
            max_price: Some(100.0),
            ..Default::default()
        };
        let (listings, total) = list_cars(&conn, &filters, 1, 10).unwrap();
        assert_eq!(total, 1);
        assert_eq!(listings[0].car.id, "car-1");
    }

    #[test]
    fn test_list_cars_hides_unavailable_by_default() {
        let conn = setup_db();
        seed_user(&conn, "owner-1");
        seed_car(&conn, "car-1", "owner-1", "Toyota", 40.0);

        let mut car = get_car(&conn, "car-1").unwrap().unwrap();
        car.is_available = false;
        update_car(&conn, &car).unwrap();

        let (listings, total) = list_cars(&conn, &CarFilters::default(), 1, 10).unwrap();
        assert_eq!(total, 0);
        assert!(listings.is_empty());

        let filters = CarFilters {
            include_unavailable: true,
            ..Default::default()
        };
        let (_, total) = list_cars(&conn, &filters, 1, 10).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_list_cars_pagination() {
        let conn = setup_db();
        seed_user(&conn, "owner-1");
        for i in 0..5 {
            seed_car(&conn, &format!("car-{i}"), "owner-1", "Toyota", 40.0);
        }

        let (page_one, total) = list_cars(&conn, &CarFilters::default(), 1, 2).unwrap();
        assert_eq!(total, 5);
        assert_eq!(page_one.len(), 2);

        let (page_three, _) = list_cars(&conn, &CarFilters::default(), 3, 2).unwrap();
        assert_eq!(page_three.len(), 1);
    }

    #[test]
    fn test_replace_car_images_marks_first_primary() {
        let conn = setup_db();
        seed_user(&conn, "owner-1");
        seed_car(&conn, "car-1", "owner-1", "Toyota", 40.0);

        replace_car_images(
            &conn,
            "car-1",
            &["https://img/a.jpg".to_string(), "https://img/b.jpg".to_string()],
        )
        .unwrap();

        let images = get_car_images(&conn, "car-1").unwrap();
        assert_eq!(images.len(), 2);
        assert!(images[0].is_primary);
        assert_eq!(images[0].image_url, "https://img/a.jpg");
        assert!(!images[1].is_primary);
    }
}
