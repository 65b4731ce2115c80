pub mod block;
pub mod booking;
pub mod car;
pub mod date_range;
pub mod location;
pub mod review;
pub mod user;

pub use block::CarBlock;
pub use booking::{Booking, BookingStatus, PaymentStatus};
pub use car::{Car, CarFilters, CarImage};
pub use date_range::DateRange;
pub use location::Location;
pub use review::Review;
pub use user::UserProfile;
