pub mod health;
pub mod links;
pub mod payment;
pub mod public;
