pub mod dispatch;
pub mod providers;
