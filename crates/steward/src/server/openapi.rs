use utoipa::OpenApi;

use crate::capability::FailureKind;
use crate::routing::AuditEntry;
use crate::server::error::{ApiErrorBody, ApiErrorResponse};
use crate::server::{AuditResponse, HealthResponse, TriggerRequest, TriggerResponse};
use crate::supervisor::SupervisorState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Steward API",
        version = "0.1.0",
        description = "HTTP front door for the steward assistant daemon"
    ),
    paths(
        crate::server::health,
        crate::server::trigger,
        crate::server::audit,
    ),
    components(schemas(
        // Error
        ApiErrorResponse,
        ApiErrorBody,
        // System
        HealthResponse,
        SupervisorState,
        AuditResponse,
        AuditEntry,
        // Commands
        TriggerRequest,
        TriggerResponse,
        FailureKind,
    )),
    tags(
        (name = "system", description = "Liveness and diagnostics"),
        (name = "commands", description = "Remote command submission"),
    )
)]
pub struct ApiDoc;
