//! Shared engine state for an embedding HTTP layer. The upstream middleware
//! supplies the authenticated role identity; everything here is role-agnostic.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::permission::resolver::PermissionResolver;
use crate::permission::store::{ensure_permission_tables, PermissionStore};
use crate::schema::service::SchemaService;
use crate::sdl::store::SdlStore;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct EngineState {
    pub pool: PgPool,
    pub sdl: Arc<SdlStore>,
    pub schema: Arc<SchemaService>,
    pub permissions: PermissionStore,
    pub resolver: Arc<PermissionResolver>,
}

impl EngineState {
    /// Wire up the whole engine: open the SDL document, ensure permission
    /// tables, and build the schema service around the configured pipeline.
    pub async fn init(pool: PgPool, config: &EngineConfig) -> Result<Self, EngineError> {
        ensure_permission_tables(&pool).await?;
        let sdl = Arc::new(SdlStore::open(config.sdl_path.clone()).await?);
        let schema = Arc::new(SchemaService::new(sdl.clone(), config.pipeline()));
        let permissions = PermissionStore::new(pool.clone());
        let resolver = Arc::new(PermissionResolver::new(permissions.clone(), sdl.clone()));
        Ok(Self {
            pool,
            sdl,
            schema,
            permissions,
            resolver,
        })
    }
}
