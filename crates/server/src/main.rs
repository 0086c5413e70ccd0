use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use identity::TokenConfig;
use server_api::{
    approve_participant, cancel_registration, create_event, delete_event, edit_event,
    edit_participants, get_event, list_events, participation_status, record_payment,
    remove_participant, request_participation, ApiContext,
};
use shared::{
    domain::{Event, EventId, Participant, UserId},
    error::{ApiError, ErrorCode},
    protocol::{EventDraft, EventEdit, EventView, MessageResponse, ParticipationStatus},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod auth;
mod config;

use app_state::AppState;
use auth::{AuthenticatedUser, Caller};
use config::{load_settings, prepare_data_dir};

type HttpError = (StatusCode, Json<ApiError>);

const MAX_BODY_BYTES: usize = 256 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let settings = load_settings();
    anyhow::ensure!(
        !settings.jwt_secret.trim().is_empty(),
        "JWT_SECRET is not configured; set it in server.toml or the environment"
    );

    let data_dir = prepare_data_dir(&settings.data_dir)?;
    let storage = Storage::open(&data_dir).await.map_err(|error| {
        error!(
            data_dir = %data_dir.display(),
            %error,
            "failed to open data directory; verify it exists and is writable"
        );
        error
    })?;

    let state = AppState {
        api: ApiContext::new(storage),
        tokens: TokenConfig {
            secret: settings.jwt_secret,
            ttl_seconds: settings.token_ttl_seconds,
        },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, data_dir = %data_dir.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    let events = Router::new()
        .route("/", get(http_list_events).post(http_create_event))
        .route(
            "/:event_id",
            get(http_get_event)
                .patch(http_edit_event)
                .delete(http_delete_event),
        )
        .route("/:event_id/participants", patch(http_edit_participants))
        .route(
            "/:event_id/request-participation",
            post(http_request_participation),
        )
        .route("/:event_id/cancel", delete(http_cancel_registration))
        .route("/:event_id/participation", get(http_participation_status))
        .route(
            "/:event_id/participants/:participant_id",
            delete(http_remove_participant),
        )
        .route(
            "/:event_id/participants/:participant_id/approve",
            post(http_approve_participant),
        )
        .route(
            "/:event_id/participants/:participant_id/payment",
            post(http_record_payment),
        );

    Router::new()
        .route("/healthz", get(healthz))
        .nest("/api/events", events)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::ValidationFailed | ErrorCode::Conflict => StatusCode::BAD_REQUEST,
        ErrorCode::CapacityExceeded => StatusCode::CONFLICT,
        ErrorCode::StoreUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn http_error(err: ApiError) -> HttpError {
    if err.code == ErrorCode::StoreUnavailable {
        error!(error = %err.message, "event store unavailable");
    }
    (status_for(err.code), Json(err))
}

fn body_error(rejection: JsonRejection) -> HttpError {
    http_error(ApiError::new(
        ErrorCode::ValidationFailed,
        rejection.body_text(),
    ))
}

/// Ids are opaque to callers, so an unparseable one names no event.
fn path_error(_rejection: PathRejection) -> HttpError {
    http_error(ApiError::not_found("event not found"))
}

async fn healthz(State(state): State<Arc<AppState>>) -> Result<&'static str, HttpError> {
    state.api.events.health_check().await.map_err(|e| {
        warn!(error = %e, "health check failed");
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::StoreUnavailable, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn http_list_events(
    State(state): State<Arc<AppState>>,
    Caller(caller): Caller,
) -> Result<Json<Vec<EventView>>, HttpError> {
    let events = list_events(&state.api, caller).await.map_err(http_error)?;
    Ok(Json(events))
}

async fn http_get_event(
    State(state): State<Arc<AppState>>,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<Event>, HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    let event = get_event(&state.api, event_id).await.map_err(http_error)?;
    Ok(Json(event))
}

async fn http_create_event(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: Result<Json<EventDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), HttpError> {
    let Json(draft) = body.map_err(body_error)?;
    let event = create_event(&state.api, user_id, draft)
        .await
        .map_err(http_error)?;
    info!(event_id = %event.id, %user_id, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

async fn http_edit_event(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<EventId>, PathRejection>,
    body: Result<Json<EventEdit>, JsonRejection>,
) -> Result<Json<Event>, HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    let Json(edit) = body.map_err(body_error)?;
    let event = edit_event(&state.api, user_id, event_id, edit)
        .await
        .map_err(http_error)?;
    info!(%event_id, %user_id, "event edited");
    Ok(Json(event))
}

async fn http_edit_participants(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<EventId>, PathRejection>,
    body: Result<Json<Vec<Participant>>, JsonRejection>,
) -> Result<Json<Event>, HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    let Json(participants) = body.map_err(body_error)?;
    let event = edit_participants(&state.api, user_id, event_id, participants)
        .await
        .map_err(http_error)?;
    info!(%event_id, %user_id, participants = event.participants.len(), "participants replaced");
    Ok(Json(event))
}

async fn http_delete_event(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<StatusCode, HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    delete_event(&state.api, user_id, event_id)
        .await
        .map_err(http_error)?;
    info!(%event_id, %user_id, "event deleted");
    Ok(StatusCode::NO_CONTENT)
}

async fn http_request_participation(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<(StatusCode, Json<Event>), HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    let event = request_participation(&state.api, user_id, event_id)
        .await
        .map_err(http_error)?;
    info!(%event_id, %user_id, "participation requested");
    Ok((StatusCode::CREATED, Json(event)))
}

async fn http_cancel_registration(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<MessageResponse>, HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    cancel_registration(&state.api, user_id, event_id)
        .await
        .map_err(http_error)?;
    info!(%event_id, %user_id, "registration cancelled");
    Ok(Json(MessageResponse {
        message: "Successfully canceled registration.".into(),
    }))
}

async fn http_participation_status(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<EventId>, PathRejection>,
) -> Result<Json<ParticipationStatus>, HttpError> {
    let Path(event_id) = path.map_err(path_error)?;
    let status = participation_status(&state.api, user_id, event_id)
        .await
        .map_err(http_error)?;
    Ok(Json(status))
}

async fn http_approve_participant(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<(EventId, UserId)>, PathRejection>,
) -> Result<Json<Participant>, HttpError> {
    let Path((event_id, participant_id)) = path.map_err(path_error)?;
    let participant = approve_participant(&state.api, user_id, event_id, participant_id)
        .await
        .map_err(http_error)?;
    info!(%event_id, %participant_id, "participant approved");
    Ok(Json(participant))
}

async fn http_record_payment(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<(EventId, UserId)>, PathRejection>,
) -> Result<Json<Participant>, HttpError> {
    let Path((event_id, participant_id)) = path.map_err(path_error)?;
    let participant = record_payment(&state.api, user_id, event_id, participant_id)
        .await
        .map_err(http_error)?;
    info!(%event_id, %participant_id, "payment recorded");
    Ok(Json(participant))
}

async fn http_remove_participant(
    State(state): State<Arc<AppState>>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    path: Result<Path<(EventId, UserId)>, PathRejection>,
) -> Result<Json<Participant>, HttpError> {
    let Path((event_id, participant_id)) = path.map_err(path_error)?;
    let participant = remove_participant(&state.api, user_id, event_id, participant_id)
        .await
        .map_err(http_error)?;
    info!(%event_id, %participant_id, "participant removed");
    Ok(Json(participant))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
