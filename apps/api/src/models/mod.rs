pub mod notification;
pub mod resume;
