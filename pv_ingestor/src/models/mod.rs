pub mod day_payload;
pub mod reading;
