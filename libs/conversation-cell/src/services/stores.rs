use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tracing::info;

use shared_config::AppConfig;

use crate::models::{ConversationError, StoredConversation};
use crate::services::codes::StoredCode;

/// Persisted dialogue position, keyed by client. Conversations carry no
/// TTL; an abandoned one is simply overwritten the next time the client
/// starts a booking.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, client_id: &str) -> Result<Option<StoredConversation>, ConversationError>;
    async fn save(
        &self,
        client_id: &str,
        conversation: &StoredConversation,
    ) -> Result<(), ConversationError>;
    async fn clear(&self, client_id: &str) -> Result<(), ConversationError>;
}

/// Issued confirmation codes, keyed by client. The store enforces the
/// TTL so an expired code is gone rather than merely stale.
#[async_trait]
pub trait CodeStore: Send + Sync {
    async fn load(&self, client_id: &str) -> Result<Option<StoredCode>, ConversationError>;
    async fn save(
        &self,
        client_id: &str,
        code: &StoredCode,
        ttl_secs: u64,
    ) -> Result<(), ConversationError>;
    async fn clear(&self, client_id: &str) -> Result<(), ConversationError>;
}

pub async fn create_redis_pool(config: &AppConfig) -> Result<Pool, ConversationError> {
    let cfg = Config::from_url(config.redis_url.clone());
    let pool = cfg
        .create_pool(Some(Runtime::Tokio1))
        .map_err(|e| ConversationError::Store(format!("failed to create Redis pool: {}", e)))?;

    let mut conn = pool
        .get()
        .await
        .map_err(|e| ConversationError::Store(format!("failed to connect to Redis: {}", e)))?;
    let _: String = redis::cmd("PING")
        .query_async(&mut conn)
        .await
        .map_err(|e| ConversationError::Store(e.to_string()))?;

    info!("Redis connection established");
    Ok(pool)
}

pub struct RedisConversationStore {
    pool: Pool,
}

impl RedisConversationStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn key(client_id: &str) -> String {
        format!("conversation:{}", client_id)
    }
}

#[async_trait]
impl ConversationStore for RedisConversationStore {
    async fn load(&self, client_id: &str) -> Result<Option<StoredConversation>, ConversationError> {
        let mut conn = connection(&self.pool).await?;
        let raw: Option<String> = conn
            .get(Self::key(client_id))
            .await
            .map_err(|e| ConversationError::Store(e.to_string()))?;

        match raw {
            Some(data) => {
                let conversation = serde_json::from_str(&data)
                    .map_err(|e| ConversationError::Store(e.to_string()))?;
                Ok(Some(conversation))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        client_id: &str,
        conversation: &StoredConversation,
    ) -> Result<(), ConversationError> {
        let mut conn = connection(&self.pool).await?;
        let data = serde_json::to_string(conversation)
            .map_err(|e| ConversationError::Store(e.to_string()))?;
        let _: () = conn
            .set(Self::key(client_id), data)
            .await
            .map_err(|e| ConversationError::Store(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, client_id: &str) -> Result<(), ConversationError> {
        let mut conn = connection(&self.pool).await?;
        let _: () = conn
            .del(Self::key(client_id))
            .await
            .map_err(|e| ConversationError::Store(e.to_string()))?;
        Ok(())
    }
}

pub struct RedisCodeStore {
    pool: Pool,
}

impl RedisCodeStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    fn key(client_id: &str) -> String {
        format!("confirmation_code:{}", client_id)
    }
}

#[async_trait]
impl CodeStore for RedisCodeStore {
    async fn load(&self, client_id: &str) -> Result<Option<StoredCode>, ConversationError> {
        let mut conn = connection(&self.pool).await?;
        let raw: Option<String> = conn
            .get(Self::key(client_id))
            .await
            .map_err(|e| ConversationError::Store(e.to_string()))?;

        match raw {
            Some(data) => {
                let code = serde_json::from_str(&data)
                    .map_err(|e| ConversationError::Store(e.to_string()))?;
                Ok(Some(code))
            }
            None => Ok(None),
        }
    }

    async fn save(
        &self,
        client_id: &str,
        code: &StoredCode,
        ttl_secs: u64,
    ) -> Result<(), ConversationError> {
        let mut conn = connection(&self.pool).await?;
        let data =
            serde_json::to_string(code).map_err(|e| ConversationError::Store(e.to_string()))?;
        let _: () = conn
            .set_ex(Self::key(client_id), data, ttl_secs)
            .await
            .map_err(|e| ConversationError::Store(e.to_string()))?;
        Ok(())
    }

    async fn clear(&self, client_id: &str) -> Result<(), ConversationError> {
        let mut conn = connection(&self.pool).await?;
        let _: () = conn
            .del(Self::key(client_id))
            .await
            .map_err(|e| ConversationError::Store(e.to_string()))?;
        Ok(())
    }
}

async fn connection(pool: &Pool) -> Result<deadpool_redis::Connection, ConversationError> {
    pool.get()
        .await
        .map_err(|e| ConversationError::Store(format!("Redis pool error: {}", e)))
}
