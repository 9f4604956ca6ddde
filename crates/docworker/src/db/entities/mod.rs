//! Database entities.

pub mod document;
pub mod upload_notification;
pub mod user;

pub use document::{DocumentStatus, Entity as Document};
pub use upload_notification::Entity as UploadNotification;
pub use user::Entity as User;
