use crate::error::Error;
use crate::service::{ImageUpload, PlaceService};
use crate::views;
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PlaceService>,
}

/// Create the application router
pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/places", post(create_place))
        .route("/places/:id/edit", get(edit_form).post(update_place))
        .route("/places/:id/delete", post(delete_place))
        .route("/health", get(health_check))
        .nest_service("/public", ServeDir::new("public"))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Every failure is logged with context and collapsed to a generic page;
/// only the explicit not-found case is distinguished for the client.
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if self.is_not_found() {
            info!(error = %self, "request for unknown place");
            return (StatusCode::NOT_FOUND, Html(views::render_not_found())).into_response();
        }

        error!(error = ?self, "request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(views::render_error()),
        )
            .into_response()
    }
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "placebook"
    }))
}

/// GET /: render the place list
#[instrument(skip(state))]
async fn home(State(state): State<AppState>) -> Result<Html<String>, Error> {
    let places = state.service.list().await?;
    Ok(Html(views::render_home(&places)))
}

/// POST /places: create a place from a multipart form
#[instrument(skip(state, multipart))]
async fn create_place(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let form = PlaceForm::parse(multipart).await?;

    let title = form
        .title
        .ok_or_else(|| Error::bad_request("missing title field"))?;
    let image = form
        .image
        .ok_or_else(|| Error::bad_request("missing image file"))?;

    state.service.create(&title, image).await?;

    Ok(Redirect::to("/"))
}

/// GET /places/:id/edit: render the edit form
#[instrument(skip(state))]
async fn edit_form(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Html<String>, Error> {
    let id = parse_place_id(&id)?;
    let place = state.service.get(id).await?;
    Ok(Html(views::render_edit(&place)))
}

/// POST /places/:id/edit: apply a multipart edit form
#[instrument(skip(state, multipart))]
async fn update_place(
    State(state): State<AppState>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Redirect, Error> {
    let id = parse_place_id(&id)?;
    let form = PlaceForm::parse(multipart).await?;

    let title = form
        .title
        .ok_or_else(|| Error::bad_request("missing title field"))?;

    state.service.edit(id, &title, form.image).await?;

    Ok(Redirect::to("/"))
}

/// POST /places/:id/delete: remove a place
#[instrument(skip(state))]
async fn delete_place(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Redirect, Error> {
    let id = parse_place_id(&id)?;
    state.service.delete(id).await?;
    Ok(Redirect::to("/"))
}

/// An id that is not a UUID cannot resolve to any record
fn parse_place_id(raw: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(raw).map_err(|_| Error::not_found(raw))
}

/// Fields accepted from the create/edit multipart forms
#[derive(Debug, Default)]
struct PlaceForm {
    title: Option<String>,
    image: Option<ImageUpload>,
}

impl PlaceForm {
    /// Read `title` and the optional `image` file out of a multipart body.
    ///
    /// Browsers submit an empty `image` part when no file was chosen on the
    /// edit form; an empty file counts as "no new image".
    async fn parse(mut multipart: Multipart) -> Result<Self, Error> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::bad_request(format!("invalid multipart body: {e}")))?
        {
            let name = field.name().map(ToOwned::to_owned);
            match name.as_deref() {
                Some("title") => {
                    let title = field
                        .text()
                        .await
                        .map_err(|e| Error::bad_request(format!("invalid title field: {e}")))?;
                    form.title = Some(title);
                }
                Some("image") => {
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| Error::bad_request(format!("invalid image field: {e}")))?;
                    if !bytes.is_empty() {
                        form.image = Some(ImageUpload {
                            bytes: bytes.to_vec(),
                            mime_type,
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(form)
    }
}
