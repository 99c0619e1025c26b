use server_api::ApiContext;

use crate::pages::Pages;

pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) pages: Pages,
}
