use crate::{catalog::HttpCatalog, service::HotelsService};

pub struct AppState {
    pub hotels: HotelsService<HttpCatalog>,
}

impl AppState {
    pub fn from_env() -> Self {
        AppState {
            hotels: HotelsService::new(HttpCatalog::from_env()),
        }
    }
}
