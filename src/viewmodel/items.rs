use std::sync::Arc;

use crate::core::model::Item;
use crate::core::state::{AsyncState, StateProjector};
use crate::error::{ClientError, ClientResult};
use crate::repository::ItemRepository;

/// Item list screen. Every write is followed by a full refetch inside the
/// same operation, so the state only ever shows what the server holds.
pub struct ItemsViewModel {
    repo: Arc<ItemRepository>,
    state: StateProjector<Vec<Item>>,
}

impl ItemsViewModel {
    pub fn new(repo: Arc<ItemRepository>) -> Self {
        Self {
            repo,
            state: StateProjector::new("items").with_empty_when(Vec::is_empty),
        }
    }

    pub fn state(&self) -> &StateProjector<Vec<Item>> {
        &self.state
    }

    pub fn fetch(&self) {
        let repo = self.repo.clone();
        self.state.run(async move { repo.get_items().await });
    }

    pub fn add(&self, name: &str) {
        let repo = self.repo.clone();
        let name = name.trim().to_string();
        self.state.run(async move {
            validate_name(&name)?;
            repo.add_item(&name).await?;
            repo.get_items().await
        });
    }

    pub fn update(&self, id: i64, name: &str) {
        let repo = self.repo.clone();
        let name = name.trim().to_string();
        self.state.run(async move {
            validate_name(&name)?;
            repo.update_item(id, &name).await?;
            repo.get_items().await
        });
    }

    pub fn delete(&self, id: i64) {
        let repo = self.repo.clone();
        self.state.run(async move {
            repo.delete_item(id).await?;
            repo.get_items().await
        });
    }

    pub fn reset(&self) {
        self.state.reset();
    }

    pub async fn settled(&self) -> AsyncState<Vec<Item>> {
        self.state.settled().await
    }
}

fn validate_name(name: &str) -> ClientResult<()> {
    if name.is_empty() {
        return Err(ClientError::invalid_input("item name is empty"));
    }
    Ok(())
}
