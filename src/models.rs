pub mod auth;
pub mod inventory;
pub mod notification;
pub mod orders;
pub mod product;
pub mod quotation;
pub mod reservation;
