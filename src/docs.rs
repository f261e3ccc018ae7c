// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- Products ---
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::set_product_status,
        handlers::products::restock,
        handlers::products::decrease_quantity,
        handlers::products::get_availability,
        handlers::products::window_availability,

        // --- Quotations ---
        handlers::quotations::create_quotation,
        handlers::quotations::list_quotations,
        handlers::quotations::get_quotation,
        handlers::quotations::update_quotation,
        handlers::quotations::cancel_quotation,
        handlers::quotations::accept_quotations,

        // --- Cart ---
        handlers::cart::get_cart,
        handlers::cart::add_to_cart,
        handlers::cart::update_cart_item,
        handlers::cart::remove_from_cart,
        handlers::cart::checkout,

        // --- Orders ---
        handlers::orders::list_customer_orders,
        handlers::orders::get_customer_order,
        handlers::orders::cancel_customer_order,
        handlers::orders::list_vendor_orders,
        handlers::orders::get_rental_order,
        handlers::orders::update_rental_order_status,
        handlers::orders::cancel_rental_order,

        // --- Order lines ---
        handlers::order_lines::pickup,
        handlers::order_lines::start_use,
        handlers::order_lines::return_line,
        handlers::order_lines::cancel_line,

        // --- Reservations ---
        handlers::reservations::list_reservations,

        // --- Notifications ---
        handlers::notifications::list_notifications,

        // --- Payments ---
        handlers::payments::payment_webhook,
    ),
    components(
        schemas(
            // --- Auth ---
            models::auth::Role,

            // --- Products & Inventory ---
            models::product::ProductStatus,
            models::product::Product,
            models::product::ProductSnapshot,
            models::inventory::Inventory,
            models::inventory::Availability,
            models::inventory::WindowAvailability,

            // --- Reservations ---
            models::reservation::ReservationStatus,
            models::reservation::RentalWindow,
            models::reservation::Reservation,
            models::reservation::ReservationFilter,

            // --- Notifications ---
            models::notification::Notification,

            // --- Quotations ---
            models::quotation::QuotationStatus,
            models::quotation::Charges,
            models::quotation::PriceComponent,
            models::quotation::Quotation,
            models::quotation::QuotationFilter,

            // --- Orders ---
            models::orders::CustomerOrderStatus,
            models::orders::PaymentStatus,
            models::orders::PaymentType,
            models::orders::RentalOrderStatus,
            models::orders::LineStatus,
            models::orders::TransferKind,
            models::orders::CustomerOrder,
            models::orders::RentalOrder,
            models::orders::RentalOrderLine,
            models::orders::Transfer,
            models::orders::TransferDetails,
            models::orders::OrderBundle,
            models::orders::RentalOrderDetail,
            models::orders::CartView,
            models::orders::ReturnOutcome,

            // --- Payloads ---
            handlers::products::CreateProductPayload,
            handlers::products::ProductCreated,
            handlers::products::SetStatusPayload,
            handlers::products::RestockPayload,
            handlers::products::DecreaseQuantityPayload,
            handlers::quotations::CreateQuotationPayload,
            handlers::quotations::UpdateQuotationPayload,
            handlers::quotations::AcceptQuotationsPayload,
            handlers::cart::AddToCartPayload,
            handlers::cart::UpdateCartItemPayload,
            handlers::cart::CheckoutPayload,
            handlers::orders::UpdateRentalOrderStatusPayload,
            handlers::order_lines::TransferPayload,
        )
    ),
    tags(
        (name = "Products", description = "Produtos e Livro de Estoque"),
        (name = "Quotations", description = "Cotações e Aceite em Lote"),
        (name = "Cart", description = "Carrinho e Checkout"),
        (name = "Orders", description = "Pedidos do Cliente e Pedidos de Locação"),
        (name = "Order Lines", description = "Retirada, Uso, Devolução e Cancelamento"),
        (name = "Reservations", description = "Reservas por Cliente ou Fornecedor"),
        (name = "Notifications", description = "Caixa de Entrada do Usuário"),
        (name = "Payments", description = "Webhook do Gateway de Pagamento")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
