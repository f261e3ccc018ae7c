pub mod store;
pub use store::{RentalStore, RentalTx};
pub mod pg_store;
pub use pg_store::PgRentalStore;
pub mod memory_store;
pub use memory_store::MemoryRentalStore;

pub mod product_repo;
pub use product_repo::ProductRepository;
pub mod inventory_repo;
pub use inventory_repo::InventoryRepository;
pub mod quotation_repo;
pub use quotation_repo::QuotationRepository;
pub mod order_repo;
pub use order_repo::OrderRepository;
pub mod notification_repo;
pub use notification_repo::NotificationRepository;
