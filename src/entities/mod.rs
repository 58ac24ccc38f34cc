pub mod prelude;

pub mod auth_tokens;
pub mod hydroponics;
pub mod sensors;
pub mod smar_tanom_data;
pub mod smar_tanoms;
pub mod users;
