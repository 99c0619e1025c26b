use std::sync::Arc;

use collaborators::{
    AppDeployer, CodeGenerator, OfflineGenerator, OpenAiGenerator, ProcessDeployer,
    UnavailableGenerator, VersionStore,
};
use shared::{
    domain::{BumpComponent, SessionId},
    error::{ApiError, ErrorCode},
    protocol::{ActionOutcome, ActionRequest, DeployedApp, GeneratedApp},
};
use storage::{AppFiles, FileVersionStore};
use tracing::{error, info, warn};

pub mod config;
mod session;

pub use config::{ConfigError, EditorConfig, GeneratorKind};
pub use session::{Session, SessionStore};

pub const FILE_NOT_FOUND: &str = "File not found.";

/// Everything a request handler needs: configuration, sessions and the collaborators.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<EditorConfig>,
    pub sessions: SessionStore,
    pub app_files: AppFiles,
    pub generator: Arc<dyn CodeGenerator>,
    pub deployer: Arc<dyn AppDeployer>,
    pub versions: Arc<dyn VersionStore>,
}

impl ApiContext {
    /// Builds the collaborators selected by `config`. `env_api_key` is the
    /// fallback for the generation backend's key.
    pub fn from_config(config: EditorConfig, env_api_key: Option<String>) -> anyhow::Result<Self> {
        let generator: Arc<dyn CodeGenerator> = match config.generator_kind() {
            GeneratorKind::Offline => Arc::new(OfflineGenerator),
            GeneratorKind::OpenAi => match OpenAiGenerator::new(config.openai_settings(env_api_key))
            {
                Ok(generator) => Arc::new(generator),
                Err(err) => {
                    warn!(%err, "code generation unavailable");
                    Arc::new(UnavailableGenerator::new(err.to_string()))
                }
            },
        };
        let versions = FileVersionStore::new(config.version_file(), &config.initial_version())?;
        Ok(Self {
            sessions: SessionStore::new(),
            app_files: AppFiles::new(config.workspace_dir()),
            generator,
            deployer: Arc::new(ProcessDeployer::new(config.deployer_settings())),
            versions: Arc::new(versions),
            config: Arc::new(config),
        })
    }
}

/// Checks the submitted pair against the configured one and, on success,
/// records the session. Failure never says which field was wrong.
pub async fn authenticate(
    ctx: &ApiContext,
    session_id: SessionId,
    username: &str,
    password: &str,
) -> Result<Session, ApiError> {
    let (expected_user, expected_password) = ctx.config.credentials();
    let user_matches = expected_user.as_deref() == Some(username);
    let password_matches = expected_password.as_deref() == Some(password);
    if !(user_matches & password_matches) {
        warn!(%session_id, "login rejected");
        return Err(ApiError::unauthorized());
    }

    let session = Session::new(username);
    ctx.sessions.insert(session_id, session.clone()).await;
    info!(
        %session_id,
        user = %session.user,
        authenticated_at = %session.authenticated_at,
        "login accepted"
    );
    Ok(session)
}

pub async fn require_session(
    ctx: &ApiContext,
    session_id: Option<SessionId>,
) -> Result<Session, ApiError> {
    let Some(session_id) = session_id else {
        return Err(ApiError::new(ErrorCode::Unauthorized, "Please log in."));
    };
    ctx.sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "Please log in."))
}

/// Runs the one collaborator call behind a button press, for an authenticated session only.
pub async fn dispatch(
    ctx: &ApiContext,
    session_id: Option<SessionId>,
    request: ActionRequest,
) -> Result<ActionOutcome, ApiError> {
    let session = require_session(ctx, session_id).await?;
    match request {
        ActionRequest::Generate { prompt } => generate_app(ctx, &session, &prompt)
            .await
            .map(ActionOutcome::Generated),
        ActionRequest::Deploy { app_file } => deploy_app(ctx, &session, &app_file)
            .await
            .map(ActionOutcome::Deployed),
        ActionRequest::BumpVersion { component } => bump_version(ctx, &session, component)
            .await
            .map(|version| ActionOutcome::VersionBumped { version }),
    }
}

/// Generates code for `prompt` and saves it as the user's app file. The file
/// is only replaced once generation has succeeded.
pub async fn generate_app(
    ctx: &ApiContext,
    session: &Session,
    prompt: &str,
) -> Result<GeneratedApp, ApiError> {
    let source = ctx.generator.generate(prompt).await.map_err(|err| {
        error!(user = %session.user, %err, "code generation failed");
        ApiError::new(ErrorCode::Generation, err.to_string())
    })?;

    ctx.app_files
        .write_app(&session.user, &source)
        .map_err(internal)?;

    Ok(GeneratedApp {
        file_name: AppFiles::file_name_for(&session.user),
        source,
    })
}

pub fn app_file_name(user: &str) -> String {
    AppFiles::file_name_for(user)
}

/// The user's current app file, if one has been generated.
pub fn current_app(ctx: &ApiContext, session: &Session) -> Result<Option<GeneratedApp>, ApiError> {
    let source = ctx.app_files.read_app(&session.user).map_err(internal)?;
    Ok(source.map(|source| GeneratedApp {
        file_name: AppFiles::file_name_for(&session.user),
        source,
    }))
}

/// Launches `file_name` if it exists. The existence check and the launch are
/// separate steps; a file removed in between is reported by the deployer.
pub async fn deploy_app(
    ctx: &ApiContext,
    session: &Session,
    file_name: &str,
) -> Result<DeployedApp, ApiError> {
    let file_name = file_name.trim();
    if !ctx.app_files.exists(file_name) {
        info!(user = %session.user, file_name, "deploy requested for missing file");
        return Err(ApiError::new(ErrorCode::NotFound, FILE_NOT_FOUND));
    }

    let path = ctx.app_files.resolve(file_name);
    let port = ctx.deployer.deploy(&path).await.map_err(|err| {
        error!(user = %session.user, file_name, %err, "deploy failed");
        ApiError::new(ErrorCode::Deploy, err.to_string())
    })?;

    info!(user = %session.user, file_name, port, "app deployed");
    Ok(DeployedApp::new(file_name, port))
}

pub async fn version_info(ctx: &ApiContext) -> Result<String, ApiError> {
    ctx.versions
        .current_version()
        .await
        .map_err(|err| ApiError::new(ErrorCode::Version, err.to_string()))
}

pub async fn bump_version(
    ctx: &ApiContext,
    session: &Session,
    component: BumpComponent,
) -> Result<String, ApiError> {
    let version = ctx.versions.bump(component).await.map_err(|err| {
        error!(user = %session.user, %component, %err, "version bump failed");
        ApiError::new(ErrorCode::Version, err.to_string())
    })?;
    info!(user = %session.user, %component, %version, "version bumped");
    Ok(version)
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, format!("{err:#}"))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
