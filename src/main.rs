//src/main.rs

use anyhow::Context;
use axum::{
    middleware as axum_middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use rental_backend::{
    config::{AppState, Settings},
    docs::ApiDoc,
    handlers,
    middleware::auth::auth_guard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // RUST_LOG controla o nível; padrão info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let settings = Settings::from_env().context("Falha ao ler a configuração")?;
    let app_state = AppState::new(&settings)
        .await
        .context("Falha ao inicializar o estado da aplicação.")?;

    // Migrações só existem no backend Postgres
    if let Some(pool) = &app_state.db_pool {
        sqlx::migrate!()
            .run(pool)
            .await
            .context("Falha ao rodar as migrações do banco de dados.")?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");
    }

    let product_routes = Router::new()
        .route("/", post(handlers::products::create_product))
        .route("/{id}", get(handlers::products::get_product))
        .route("/{id}/status", patch(handlers::products::set_product_status))
        .route("/{id}/restock", post(handlers::products::restock))
        .route("/{id}/decrease", post(handlers::products::decrease_quantity))
        .route("/{id}/availability", get(handlers::products::get_availability))
        .route("/{id}/availability/window", get(handlers::products::window_availability));

    let quotation_routes = Router::new()
        .route("/"
               ,post(handlers::quotations::create_quotation)
               .get(handlers::quotations::list_quotations)
        )
        .route("/accept", post(handlers::quotations::accept_quotations))
        .route("/{id}"
               ,get(handlers::quotations::get_quotation)
               .patch(handlers::quotations::update_quotation)
        )
        .route("/{id}/cancel", post(handlers::quotations::cancel_quotation));

    let cart_routes = Router::new()
        .route("/", get(handlers::cart::get_cart))
        .route("/items", post(handlers::cart::add_to_cart))
        .route("/items/{line_id}"
               ,patch(handlers::cart::update_cart_item)
               .delete(handlers::cart::remove_from_cart)
        )
        .route("/checkout", post(handlers::cart::checkout));

    let order_routes = Router::new()
        .route("/", get(handlers::orders::list_customer_orders))
        .route("/rental", get(handlers::orders::list_vendor_orders))
        .route("/rental/{id}", get(handlers::orders::get_rental_order))
        .route("/rental/{id}/status", patch(handlers::orders::update_rental_order_status))
        .route("/rental/{id}/cancel", post(handlers::orders::cancel_rental_order))
        .route("/{id}", get(handlers::orders::get_customer_order))
        .route("/{id}/cancel", post(handlers::orders::cancel_customer_order));

    let line_routes = Router::new()
        .route("/{id}/pickup", post(handlers::order_lines::pickup))
        .route("/{id}/start-use", post(handlers::order_lines::start_use))
        .route("/{id}/return", post(handlers::order_lines::return_line))
        .route("/{id}/cancel", post(handlers::order_lines::cancel_line));

    // Tudo sob /api exige Bearer, exceto health e o webhook (assinado por HMAC)
    let protected = Router::new()
        .nest("/api/products", product_routes)
        .nest("/api/quotations", quotation_routes)
        .nest("/api/cart", cart_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/order-lines", line_routes)
        .route("/api/reservations", get(handlers::reservations::list_reservations))
        .route("/api/notifications", get(handlers::notifications::list_notifications))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    let app = Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/payments/webhook", post(handlers::payments::payment_webhook))
        .merge(protected)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&settings.bind_addr)
        .await
        .with_context(|| format!("Falha ao iniciar o listener TCP em {}", settings.bind_addr))?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app)
        .await
        .context("Erro no servidor Axum")?;
    Ok(())
}
