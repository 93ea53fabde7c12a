pub mod attendance;
pub mod center;
pub mod child;
pub mod notification;
pub mod parent;
pub mod role;
pub mod teacher;
pub mod user;
