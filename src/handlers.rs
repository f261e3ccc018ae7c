pub mod products;
pub mod quotations;
pub mod cart;
pub mod orders;
pub mod order_lines;
pub mod payments;
pub mod reservations;
pub mod notifications;
