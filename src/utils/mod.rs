pub mod center_cache;
pub mod db_utils;
pub mod export;
pub mod mailer;
pub mod period;
