pub mod errors;
pub mod id;
pub mod notifications;

pub use errors::{ConfigError, ParleyError, SessionError};
pub use id::new_correlation_id;
pub use notifications::{Notification, NotificationLevel};

pub type Result<T> = std::result::Result<T, ParleyError>;
