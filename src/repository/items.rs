use std::sync::Arc;

use crate::core::model::{Item, ItemBody, ItemEnvelope};
use crate::error::ClientResult;
use crate::repository::decode;
use crate::transport::{ApiRequest, Transport};

/// CRUD over the remote item list. The server owns ids; writes return what it
/// answered and never touch a local copy.
pub struct ItemRepository {
    transport: Arc<dyn Transport>,
}

impl ItemRepository {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// A missing or null `items.data` is an empty list, never an error.
    pub async fn get_items(&self) -> ClientResult<Vec<Item>> {
        let envelope: ItemEnvelope = decode(self.transport.execute_json(ApiRequest::get("/api/items")).await?)?;
        Ok(envelope.into_items())
    }

    /// Returns the created item as echoed by the server, when it echoes one.
    pub async fn add_item(&self, name: &str) -> ClientResult<Option<Item>> {
        let req = ApiRequest::post("/api/item").with_json(&ItemBody { name })?;
        let envelope: ItemEnvelope = decode(self.transport.execute_json(req).await?)?;
        Ok(envelope.into_items().into_iter().next())
    }

    pub async fn update_item(&self, id: i64, name: &str) -> ClientResult<()> {
        let req = ApiRequest::put(format!("/api/item/{id}")).with_json(&ItemBody { name })?;
        self.transport.execute_json(req).await?;
        Ok(())
    }

    pub async fn delete_item(&self, id: i64) -> ClientResult<()> {
        self.transport.execute_json(ApiRequest::delete(format!("/api/item/{id}"))).await?;
        Ok(())
    }
}
