use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use server_api::{
    app_file_name, authenticate, current_app, dispatch, require_session, version_info,
    ApiContext, EditorConfig, Session,
};
use shared::{
    domain::{ActionKind, BumpComponent, SessionId},
    error::ErrorCode,
    protocol::{ActionOutcome, ActionRequest},
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod pages;

use app_state::AppState;
use config::load_settings;
use pages::{Notice, Pages, WorkspaceView};

const SESSION_COOKIE: &str = "gbt_session";
const MAX_FORM_BYTES: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct PageQuery {
    action: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
struct GenerateForm {
    #[serde(default)]
    prompt: String,
}

#[derive(Debug, Deserialize)]
struct DeployForm {
    #[serde(default)]
    app_file: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let editor_config = EditorConfig::load(&settings.config_path).map_err(|error| {
        error!(%error, "cannot start without configuration");
        error
    })?;
    let api = ApiContext::from_config(editor_config, settings.openai_api_key)?;
    let pages = Pages::new()?;

    let app = build_router(Arc::new(AppState { api, pages }));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, config = %settings.config_path.display(), "GBT-Editor listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/", get(index))
        .route("/login", post(login))
        .route("/apps/generate", post(generate))
        .route("/apps/deploy", post(deploy))
        .route("/version/bump", post(bump_version))
        .layer(RequestBodyLimitLayer::new(MAX_FORM_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

/// Renders the page for the selected action. Never calls a collaborator
/// operation that changes anything.
async fn index(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(q): Query<PageQuery>,
) -> Response {
    let action = q
        .action
        .as_deref()
        .and_then(|action| action.parse::<ActionKind>().ok())
        .unwrap_or_default();

    let Some(session_id) = session_cookie(&headers) else {
        let mut response = login_page(&state, StatusCode::OK, None);
        set_session_cookie(&mut response, SessionId::new());
        return response;
    };

    match require_session(&state.api, Some(session_id)).await {
        Ok(session) => {
            let view = workspace_view(&state, &session, action).await;
            render_workspace(&state, StatusCode::OK, &view)
        }
        Err(_) => login_page(&state, StatusCode::OK, None),
    }
}

/// A successful login always gets a new session id; the one the client
/// arrived with stays anonymous.
async fn login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let fresh_id = SessionId::new();
    match authenticate(&state.api, fresh_id, &form.username, &form.password).await {
        Ok(_) => {
            let mut response = Redirect::to("/").into_response();
            set_session_cookie(&mut response, fresh_id);
            response
        }
        Err(err) => {
            let mut response = login_page(
                &state,
                StatusCode::UNAUTHORIZED,
                Some(Notice::error(err.message)),
            );
            if session_cookie(&headers).is_none() {
                set_session_cookie(&mut response, fresh_id);
            }
            response
        }
    }
}

async fn generate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<GenerateForm>,
) -> Response {
    run_action(&state, &headers, ActionRequest::Generate { prompt: form.prompt }).await
}

async fn deploy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<DeployForm>,
) -> Response {
    run_action(
        &state,
        &headers,
        ActionRequest::Deploy {
            app_file: form.app_file,
        },
    )
    .await
}

async fn bump_version(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    run_action(
        &state,
        &headers,
        ActionRequest::BumpVersion {
            component: BumpComponent::Patch,
        },
    )
    .await
}

/// One button press: one dispatch, then one render of the result.
async fn run_action(state: &AppState, headers: &HeaderMap, request: ActionRequest) -> Response {
    let session_id = session_cookie(headers);
    let action = request.kind();
    let submitted = request.clone();

    let result = dispatch(&state.api, session_id, request).await;
    let session = match require_session(&state.api, session_id).await {
        Ok(session) => session,
        Err(err) => {
            return login_page(
                state,
                StatusCode::UNAUTHORIZED,
                Some(Notice::error(err.message)),
            )
        }
    };

    if let Ok(ActionOutcome::VersionBumped { .. }) = result {
        return Redirect::to("/?action=version").into_response();
    }

    let mut view = workspace_view(state, &session, action).await;
    if let ActionRequest::Generate { prompt } = &submitted {
        view.prompt = prompt.clone();
    }
    let status = match result {
        Ok(ActionOutcome::Generated(app)) => {
            view.notice = Some(Notice::success(format!("Saved to {}", app.file_name)));
            view.code_file = Some(app.file_name);
            view.code = Some(app.source);
            StatusCode::OK
        }
        Ok(ActionOutcome::Deployed(app)) => {
            view.notice = Some(Notice::success(app.success_message()));
            view.app_file = app.file_name;
            StatusCode::OK
        }
        Ok(ActionOutcome::VersionBumped { .. }) => StatusCode::OK,
        Err(err) => {
            if let ActionRequest::Deploy { app_file } = submitted {
                view.app_file = app_file;
            }
            view.notice = Some(Notice::error(err.message));
            status_for(err.code)
        }
    };
    render_workspace(state, status, &view)
}

/// Read-only data for the selected action.
async fn workspace_view(state: &AppState, session: &Session, action: ActionKind) -> WorkspaceView {
    let mut view = WorkspaceView::new(&session.user, action, app_file_name(&session.user));
    match action {
        ActionKind::CreateOrEdit => match current_app(&state.api, session) {
            Ok(Some(app)) => {
                view.code_file = Some(app.file_name);
                view.code = Some(app.source);
            }
            Ok(None) => {}
            Err(err) => view.notice = Some(Notice::error(err.message)),
        },
        ActionKind::Deploy => {}
        ActionKind::VersionInfo => match version_info(&state.api).await {
            Ok(version) => view.version = Some(version),
            Err(err) => view.notice = Some(Notice::error(err.message)),
        },
    }
    view
}

fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Generation | ErrorCode::Deploy => StatusCode::BAD_GATEWAY,
        ErrorCode::Version | ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn login_page(state: &AppState, status: StatusCode, notice: Option<Notice>) -> Response {
    html(status, state.pages.login(notice))
}

fn render_workspace(state: &AppState, status: StatusCode, view: &WorkspaceView) -> Response {
    html(status, state.pages.workspace(view))
}

fn html(status: StatusCode, rendered: Result<String, minijinja::Error>) -> Response {
    match rendered {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!(%err, "template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "template rendering failed").into_response()
        }
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| value.parse().ok())
}

fn set_session_cookie(response: &mut Response, session_id: SessionId) {
    let cookie = format!("{SESSION_COOKIE}={session_id}; Path=/; HttpOnly; SameSite=Lax");
    if let Ok(value) = HeaderValue::from_str(&cookie) {
        response.headers_mut().insert(header::SET_COOKIE, value);
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
