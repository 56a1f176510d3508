pub mod health;
pub mod plants;
