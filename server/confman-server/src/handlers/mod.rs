pub mod configurations;
pub mod health;
pub mod schemas;
