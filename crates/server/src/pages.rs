use minijinja::{context, Environment};
use serde::Serialize;
use shared::domain::ActionKind;

pub const TITLE: &str = "GBT-Editor";

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub kind: &'static str,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success",
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error",
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ActionItem {
    slug: &'static str,
    label: &'static str,
    selected: bool,
}

/// Everything the authenticated page shows for one render.
#[derive(Debug, Serialize)]
pub struct WorkspaceView {
    title: &'static str,
    pub user: String,
    action: &'static str,
    actions: Vec<ActionItem>,
    pub notice: Option<Notice>,
    pub prompt: String,
    pub code: Option<String>,
    pub code_file: Option<String>,
    pub default_app_file: String,
    pub app_file: String,
    pub version: Option<String>,
}

impl WorkspaceView {
    pub fn new(user: impl Into<String>, action: ActionKind, default_app_file: String) -> Self {
        Self {
            title: TITLE,
            user: user.into(),
            action: action.slug(),
            actions: ActionKind::ALL
                .into_iter()
                .map(|kind| ActionItem {
                    slug: kind.slug(),
                    label: kind.label(),
                    selected: kind == action,
                })
                .collect(),
            notice: None,
            prompt: String::new(),
            code: None,
            code_file: None,
            default_app_file,
            app_file: String::new(),
            version: None,
        }
    }
}

/// Embedded templates. HTML auto-escaping is on for every `.html` template.
pub struct Pages {
    env: Environment<'static>,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("base.html", include_str!("../templates/base.html"))?;
        env.add_template("notice.html", include_str!("../templates/notice.html"))?;
        env.add_template("login.html", include_str!("../templates/login.html"))?;
        env.add_template("workspace.html", include_str!("../templates/workspace.html"))?;
        Ok(Self { env })
    }

    pub fn login(&self, notice: Option<Notice>) -> Result<String, minijinja::Error> {
        self.env
            .get_template("login.html")?
            .render(context! { title => TITLE, notice => notice })
    }

    pub fn workspace(&self, view: &WorkspaceView) -> Result<String, minijinja::Error> {
        self.env.get_template("workspace.html")?.render(view)
    }
}
