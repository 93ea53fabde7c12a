pub mod attendance;
pub mod center;
pub mod child;
pub mod dashboard;
pub mod notification;
pub mod parent;
pub mod report;
pub mod teacher;
