use async_trait::async_trait;
use codespace_core::{
    CodespaceError, PrivacyState, PrivacyUpdate, Result, Space, SpaceFile, SpaceStatus,
};
use rusqlite::ErrorCode;

use super::SpaceRepo;

/// Asynchronous store of spaces, as consumed by the HTTP handlers and the sync engine.
///
/// Every method is a suspension point; callers must not assume a write has
/// completed before the next event from the same connection is processed.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    async fn get_by_name(&self, name: &str) -> Result<Option<Space>>;

    async fn status(&self, name: &str) -> Result<Option<SpaceStatus>>;

    async fn create_with_defaults(&self, name: &str) -> Result<Space>;

    /// Returns the space and whether it was created by this call
    async fn get_or_create(&self, name: &str) -> Result<(Space, bool)>;

    async fn update_file_content(&self, name: &str, file_name: &str, content: &str)
    -> Result<()>;

    /// Fails with `FileExists` when the name is taken, `SpaceNotFound` when the space is missing
    async fn append_file(&self, name: &str, file: SpaceFile) -> Result<Space>;

    /// Idempotent; fails only with `SpaceNotFound`
    async fn remove_file(&self, name: &str, file_name: &str) -> Result<Space>;

    async fn set_privacy(&self, name: &str, update: PrivacyUpdate) -> Result<PrivacyState>;
}

impl SpaceRepo {
    /// Run a repository call on the blocking pool
    async fn blocking<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&SpaceRepo) -> Result<T> + Send + 'static,
    {
        let repo = self.clone();
        tokio::task::spawn_blocking(move || f(&repo))
            .await
            .map_err(|e| CodespaceError::Storage(e.to_string()))?
    }
}

#[async_trait]
impl SpaceStore for SpaceRepo {
    async fn get_by_name(&self, name: &str) -> Result<Option<Space>> {
        let name = name.to_string();
        self.blocking(move |repo| repo.get_space(&name).map_err(storage_error))
            .await
    }

    async fn status(&self, name: &str) -> Result<Option<SpaceStatus>> {
        let name = name.to_string();
        self.blocking(move |repo| repo.get_status(&name).map_err(storage_error))
            .await
    }

    async fn create_with_defaults(&self, name: &str) -> Result<Space> {
        let name = name.to_string();
        self.blocking(move |repo| {
            repo.create_space(&name).map_err(|e| {
                if is_constraint_violation(&e) {
                    CodespaceError::Validation(format!("Codespace '{}' already exists", name))
                } else {
                    storage_error(e)
                }
            })
        })
        .await
    }

    async fn get_or_create(&self, name: &str) -> Result<(Space, bool)> {
        let name = name.to_string();
        self.blocking(move |repo| repo.get_or_create_space(&name).map_err(storage_error))
            .await
    }

    async fn update_file_content(
        &self,
        name: &str,
        file_name: &str,
        content: &str,
    ) -> Result<()> {
        let (name, file_name, content) =
            (name.to_string(), file_name.to_string(), content.to_string());
        self.blocking(move |repo| {
            let updated = repo
                .update_file_content(&name, &file_name, &content)
                .map_err(storage_error)?;
            if updated {
                Ok(())
            } else {
                Err(CodespaceError::FileNotFound {
                    space: name,
                    file: file_name,
                })
            }
        })
        .await
    }

    async fn append_file(&self, name: &str, file: SpaceFile) -> Result<Space> {
        let name = name.to_string();
        self.blocking(move |repo| match repo.append_file(&name, &file) {
            Ok(Some(space)) => Ok(space),
            Ok(None) => Err(CodespaceError::SpaceNotFound(name)),
            Err(e) if is_constraint_violation(&e) => Err(CodespaceError::FileExists {
                space: name,
                file: file.name,
            }),
            Err(e) => Err(storage_error(e)),
        })
        .await
    }

    async fn remove_file(&self, name: &str, file_name: &str) -> Result<Space> {
        let (name, file_name) = (name.to_string(), file_name.to_string());
        self.blocking(move |repo| {
            repo.remove_file(&name, &file_name)
                .map_err(storage_error)?
                .ok_or(CodespaceError::SpaceNotFound(name))
        })
        .await
    }

    async fn set_privacy(&self, name: &str, update: PrivacyUpdate) -> Result<PrivacyState> {
        let name = name.to_string();
        self.blocking(move |repo| {
            if repo.set_privacy(&name, &update).map_err(storage_error)? {
                Ok(PrivacyState {
                    is_public: update.is_public,
                    has_secret: update.secret_hash.is_some(),
                })
            } else {
                Err(CodespaceError::SpaceNotFound(name))
            }
        })
        .await
    }
}

fn storage_error(e: rusqlite::Error) -> CodespaceError {
    CodespaceError::Storage(e.to_string())
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    e.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}
