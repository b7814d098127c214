//! OpenAPI documentation
//!
//! Exported by the `export_openapi` binary.

use utoipa::OpenApi;

use crate::gateway::handlers::HealthResponse;
use crate::webhook::WebhookAck;
use crate::webhook::error::WebhookRejection;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coin Top-up Webhook API",
        version = "1.0.0",
        description = "Receives Stripe webhook events and finalizes coin top-ups exactly once.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::webhook::handler::stripe_webhook,
    ),
    components(schemas(HealthResponse, WebhookAck, WebhookRejection)),
    tags(
        (name = "Webhook", description = "Payment provider notifications (signature auth)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
