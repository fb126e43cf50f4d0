//! Domain model (notifications, properties, platforms, targets, errors).
//!
//! Everything here is pure data and pure functions: no I/O, no async.

pub mod errors;
pub mod ids;
pub mod notification;
pub mod platform;
pub mod properties;
pub mod target;

pub use errors::{DispatchError, ErrorKind};
pub use ids::{NotificationId, RunId};
pub use notification::Notification;
pub use platform::{CanonicalPlatform, EnvironmentPlatform, PlatformError};
pub use properties::{BuildProperties, DEFAULT_LOCALE, extract};
pub use target::{DispatchTarget, ENV_PLATFORM_PARAM, JobParameters, NODES_PARAM};
