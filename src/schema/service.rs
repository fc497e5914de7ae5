//! Table operations over the SDL store: reads take snapshots, mutations run
//! stage -> pipeline -> commit under one global critical section. The external
//! tooling assumes single-writer access to the migration history, so two
//! mutations must never interleave their pipeline steps.

use crate::error::EngineError;
use crate::schema::mutator::{stage_create, stage_delete, stage_update, TablePatch};
use crate::schema::pipeline::MigrationPipeline;
use crate::sdl::parser::{parse_model_fields, parse_models};
use crate::sdl::store::SdlStore;
use crate::sdl::types::{FieldDefinition, ModelDefinition, ModelFields, SCALAR_TYPES};
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct SchemaService {
    store: Arc<SdlStore>,
    pipeline: MigrationPipeline,
    mutation: Mutex<()>,
}

impl SchemaService {
    pub fn new(store: Arc<SdlStore>, pipeline: MigrationPipeline) -> Self {
        Self {
            store,
            pipeline,
            mutation: Mutex::new(()),
        }
    }

    /// All tables in the committed document, in source order. Malformed SDL
    /// degrades to an empty list rather than an error.
    pub async fn list_tables(&self) -> Vec<ModelDefinition> {
        parse_models(&self.store.snapshot().await)
    }

    /// Fields of one table, in source order.
    pub async fn get_table_fields(&self, table: &str) -> Result<ModelFields, EngineError> {
        parse_model_fields(&self.store.snapshot().await, table)
            .ok_or_else(|| EngineError::TableNotFound(table.to_string()))
    }

    /// Scalar types accepted in field definitions.
    pub fn list_data_types(&self) -> &'static [&'static str] {
        SCALAR_TYPES
    }

    /// Create a table: stage the new document, sync the live database, commit.
    /// Mutation errors surface before any pipeline step runs.
    pub async fn create_table(
        &self,
        name: &str,
        description: &str,
        fields: &[FieldDefinition],
    ) -> Result<ModelDefinition, EngineError> {
        let _guard = self.mutation.lock().await;
        let current = self.store.snapshot().await;
        let staged = stage_create(&current, name, description, fields)?;
        self.sync_and_commit(&staged).await?;
        Ok(ModelDefinition {
            name: name.to_string(),
            description: description.to_string(),
            field_count: fields.len(),
        })
    }

    /// Replace a table definition (optionally renaming it), then sync and commit.
    pub async fn update_table(
        &self,
        table: &str,
        patch: &TablePatch,
    ) -> Result<ModelFields, EngineError> {
        let _guard = self.mutation.lock().await;
        let current = self.store.snapshot().await;
        let staged = stage_update(&current, table, patch)?;
        self.sync_and_commit(&staged).await?;
        let name = patch.new_name.as_deref().unwrap_or(table);
        parse_model_fields(&staged, name)
            .ok_or_else(|| EngineError::TableNotFound(name.to_string()))
    }

    /// Drop a table from the document, then sync and commit.
    pub async fn delete_table(&self, table: &str) -> Result<(), EngineError> {
        let _guard = self.mutation.lock().await;
        let current = self.store.snapshot().await;
        let staged = stage_delete(&current, table)?;
        self.sync_and_commit(&staged).await
    }

    /// Commit rule: the staged document replaces the committed one only after
    /// the whole pipeline succeeds. A failed attempt leaves the store and the
    /// live database exactly as they were.
    async fn sync_and_commit(&self, staged: &str) -> Result<(), EngineError> {
        self.pipeline.run(staged).await?;
        self.store.commit(staged).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::pipeline::testing::ScriptedTool;
    use crate::schema::pipeline::PipelineStep;
    use std::path::PathBuf;

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("schemakit_service_{}_{}", tag, std::process::id()))
    }

    async fn service(tag: &str, initial: &str, tool: ScriptedTool) -> SchemaService {
        let dir = temp_dir(tag);
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("schema.sdl"), initial).unwrap();
        let store = Arc::new(SdlStore::open(dir.join("schema.sdl")).await.unwrap());
        let pipeline = MigrationPipeline::new(Box::new(tool), dir.join("staged.sdl"));
        SchemaService::new(store, pipeline)
    }

    fn field(name: &str, ty: &str) -> FieldDefinition {
        FieldDefinition {
            name: name.into(),
            type_name: ty.into(),
            required: true,
            unique: false,
            default: None,
            description: String::new(),
        }
    }

    const LOAN_ONLY: &str = "model Loan {\n  id String @unique\n}\n";

    #[tokio::test]
    async fn create_commits_on_pipeline_success() {
        let svc = service("create_ok", LOAN_ONLY, ScriptedTool::succeeding()).await;
        let created = svc
            .create_table("Payment", "loan payments", &[field("id", "String")])
            .await
            .expect("create");
        assert_eq!(created.field_count, 1);

        let names: Vec<_> = svc.list_tables().await.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Loan", "Payment"]);
    }

    #[tokio::test]
    async fn failed_apply_leaves_committed_document_unchanged() {
        let svc = service(
            "atomic",
            LOAN_ONLY,
            ScriptedTool::failing_at(PipelineStep::Applying),
        )
        .await;
        let err = svc
            .create_table("Payment", "", &[field("id", "String")])
            .await
            .unwrap_err();
        match err {
            EngineError::Migration { step, .. } => assert_eq!(step, "Applying"),
            other => panic!("expected migration error, got {:?}", other),
        }

        let names: Vec<_> = svc.list_tables().await.into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["Loan"]);
    }

    #[tokio::test]
    async fn duplicate_create_fails_before_the_pipeline_runs() {
        let tool = ScriptedTool::succeeding();
        let ran = tool.ran.clone();
        let svc = service("dup", LOAN_ONLY, tool).await;
        let err = svc
            .create_table("loan", "", &[field("id", "String")])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::DuplicateTable(_)));
        assert!(ran.lock().unwrap().is_empty());
        assert_eq!(svc.list_tables().await.len(), 1);
    }

    #[tokio::test]
    async fn update_renames_and_returns_new_definition() {
        let svc = service("rename", LOAN_ONLY, ScriptedTool::succeeding()).await;
        let patch = TablePatch {
            new_name: Some("Mortgage".into()),
            description: Some("secured loans".into()),
            fields: None,
        };
        let updated = svc.update_table("Loan", &patch).await.expect("update");
        assert_eq!(updated.name, "Mortgage");
        assert_eq!(updated.description, "secured loans");
        assert_eq!(updated.fields.len(), 1);

        assert!(svc.get_table_fields("Loan").await.is_err());
        assert!(svc.get_table_fields("Mortgage").await.is_ok());
    }

    #[tokio::test]
    async fn delete_removes_table_after_sync() {
        let svc = service("delete", LOAN_ONLY, ScriptedTool::succeeding()).await;
        svc.delete_table("Loan").await.expect("delete");
        assert!(svc.list_tables().await.is_empty());
    }

    #[tokio::test]
    async fn get_table_fields_misses_are_not_found() {
        let svc = service("miss", LOAN_ONLY, ScriptedTool::succeeding()).await;
        let err = svc.get_table_fields("Payment").await.unwrap_err();
        assert!(matches!(err, EngineError::TableNotFound(name) if name == "Payment"));
    }

    #[tokio::test]
    async fn data_types_list_is_stable() {
        let svc = service("types", "", ScriptedTool::succeeding()).await;
        assert!(svc.list_data_types().contains(&"String"));
        assert!(svc.list_data_types().contains(&"DateTime"));
    }
}
