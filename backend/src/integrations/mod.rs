//! Adapters for the services this backend talks to but does not own:
//! outbound email, image hosting and the billing provider.

pub mod billing;
pub mod email;
pub mod images;

pub use billing::{BillingError, BillingProvider, StripeClient};
pub use email::{DeliveryError, LogMailer, Mailer, SendGridMailer};
pub use images::{CloudinaryHost, DisabledImageHost, ImageHost, UploadError};
