pub use super::auth_tokens::Entity as AuthTokens;
pub use super::hydroponics::Entity as Hydroponics;
pub use super::sensors::Entity as Sensors;
pub use super::smar_tanom_data::Entity as SmarTanomData;
pub use super::smar_tanoms::Entity as SmarTanoms;
pub use super::users::Entity as Users;
