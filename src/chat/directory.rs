use std::sync::Arc;

use log::{debug, info};

use crate::dispatch::models::{ConversationListResponse, ConversationRecord, ConversationTitle};
use crate::dispatch::{Dispatch, Endpoint, encode, fetch};
use crate::error::{ConsoleError, ConsoleResult, DispatchError, required};

/// Conversations the backend keeps: listing, lookup, creation, renaming and
/// deletion. Nothing is cached here; a stored conversation is continued with
/// [`ChatSession::resume`](super::ChatSession::resume).
pub struct ConversationDirectory {
    dispatcher: Arc<dyn Dispatch>,
}

impl ConversationDirectory {
    pub fn new(dispatcher: Arc<dyn Dispatch>) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self) -> ConsoleResult<Vec<ConversationRecord>> {
        let response = fetch::<ConversationListResponse>(
            &*self.dispatcher,
            Endpoint::list_conversations(),
            None,
        )
        .await?;
        let records = response.into_records();
        debug!("Fetched {} conversations", records.len());
        Ok(records)
    }

    pub async fn get(&self, id: &str) -> ConsoleResult<ConversationRecord> {
        let id = required("conversation id", id)?;
        fetch::<ConversationRecord>(&*self.dispatcher, Endpoint::conversation(id), None)
            .await
            .map_err(|err| not_found(id, err))
    }

    pub async fn create(&self, title: &str) -> ConsoleResult<ConversationRecord> {
        let title = required("title", title)?;
        let payload = encode(&ConversationTitle { title })?;
        let record = fetch::<ConversationRecord>(
            &*self.dispatcher,
            Endpoint::create_conversation(),
            Some(payload),
        )
        .await?;
        info!("Created conversation {} ({title})", record.id);
        Ok(record)
    }

    pub async fn rename(&self, id: &str, title: &str) -> ConsoleResult<ConversationRecord> {
        let id = required("conversation id", id)?;
        let title = required("title", title)?;
        let payload = encode(&ConversationTitle { title })?;
        let record = fetch::<ConversationRecord>(
            &*self.dispatcher,
            Endpoint::rename_conversation(id),
            Some(payload),
        )
        .await
        .map_err(|err| not_found(id, err))?;
        info!("Renamed conversation {id} to {title}");
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> ConsoleResult<()> {
        let id = required("conversation id", id)?;
        self.dispatcher
            .dispatch(Endpoint::delete_conversation(id), None)
            .await
            .map_err(|err| not_found(id, err))?;
        info!("Deleted conversation {id}");
        Ok(())
    }
}

fn not_found(id: &str, err: DispatchError) -> ConsoleError {
    match err {
        DispatchError::Api { status: 404, .. } => ConsoleError::NotFound(format!("conversation {id}")),
        other => other.into(),
    }
}
