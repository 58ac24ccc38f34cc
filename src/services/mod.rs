pub mod activation;
pub use activation::ActivationTokens;

pub mod mailer;
pub use mailer::{ConsoleMailer, Mailer, OutgoingEmail, SmtpMailer, build_mailer};

pub mod account_service;
pub mod account_service_impl;
pub use account_service::{
    AccountError, AccountService, ProfileUpdate, RegisteredUser, Registration, SessionGrant,
    UserProfile,
};
pub use account_service_impl::SeaOrmAccountService;

pub mod hydroponics_service;
pub mod hydroponics_service_impl;
pub use hydroponics_service::{
    CreatedSystem, HydroponicsError, HydroponicsService, LatestReading, StoredReading,
    SystemRequest,
};
pub use hydroponics_service_impl::SeaOrmHydroponicsService;
