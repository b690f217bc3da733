pub mod db;
pub mod gamification;
