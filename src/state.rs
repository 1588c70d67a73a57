use std::sync::Arc;

use crate::auth::{AuthService, TokenIssuer};
use crate::config::Config;
use crate::db::{PerfumeStore, RoleStore, UserStore};
use crate::upload::ImageUploader;

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub config: Config,
    pub auth: AuthService,
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    pub perfumes: Arc<dyn PerfumeStore>,
    /// `None` when no image host is configured; image uploads then fail.
    pub images: Option<Arc<dyn ImageUploader>>,
}

impl AppState {
    pub fn new(
        config: Config,
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        perfumes: Arc<dyn PerfumeStore>,
        images: Option<Arc<dyn ImageUploader>>,
    ) -> Self {
        let auth = AuthService::new(
            users.clone(),
            roles.clone(),
            TokenIssuer::new(&config.jwt_secret),
        );
        Self {
            config,
            auth,
            users,
            roles,
            perfumes,
            images,
        }
    }
}
