pub mod auth;
pub mod settlement;
pub mod payment_gateway;
pub mod notification_service;

pub mod inventory_service;
pub mod product_service;
pub mod order_service;
pub mod quotation_service;
pub mod cart_service;
pub mod lifecycle_service;
