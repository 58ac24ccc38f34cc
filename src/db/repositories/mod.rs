pub mod hydroponic;
pub mod reading;
pub mod token;
pub mod user;
