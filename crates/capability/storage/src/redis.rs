//! Redis 文档存储实现
//!
//! 键布局：
//! - `regdoc:{index}`：索引标记
//! - `regdoc:{index}:collections`：集合名 SET
//! - `regdoc:{index}:{collection}:mapping`：映射 JSON
//! - `regdoc:{index}:{collection}:doc:{id}`：文档 JSON
//!
//! 局部更新使用 WATCH / MULTI / EXEC；EXEC 被打断视为一次版本冲突。
//! 每次操作获取独立连接，WATCH 不会被其他请求共享。

use crate::error::StorageError;
use crate::models::{CollectionRef, CreateOutcome, Document, UpdateOutcome, merge_document};
use crate::traits::DocumentStore;
use domain::MappingSchema;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;
use tracing::debug;

const KEY_PREFIX: &str = "regdoc";

fn index_key(index: &str) -> String {
    format!("{}:{}", KEY_PREFIX, index)
}

fn collections_key(index: &str) -> String {
    format!("{}:{}:collections", KEY_PREFIX, index)
}

fn mapping_key(location: &CollectionRef) -> String {
    format!(
        "{}:{}:{}:mapping",
        KEY_PREFIX, location.index, location.collection
    )
}

fn document_key(location: &CollectionRef, id: &str) -> String {
    format!(
        "{}:{}:{}:doc:{}",
        KEY_PREFIX, location.index, location.collection, id
    )
}

/// Redis 文档存储
pub struct RedisDocumentStore {
    client: redis::Client,
}

impl RedisDocumentStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StorageError> {
        Ok(self.client.get_multiplexed_tokio_connection().await?)
    }

    async fn ensure_collection(
        &self,
        connection: &mut MultiplexedConnection,
        location: &CollectionRef,
    ) -> Result<(), StorageError> {
        let exists: bool = connection
            .sismember(collections_key(&location.index), &location.collection)
            .await?;
        if exists {
            Ok(())
        } else {
            Err(StorageError::backend(format!(
                "collection {} not found",
                location
            )))
        }
    }

    async fn load_mapping(
        &self,
        connection: &mut MultiplexedConnection,
        location: &CollectionRef,
    ) -> Result<Option<MappingSchema>, StorageError> {
        let data: Option<String> = connection.get(mapping_key(location)).await?;
        match data {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }
}

fn check_mapping(
    mapping: Option<&MappingSchema>,
    location: &CollectionRef,
    source: &Document,
) -> Result<(), StorageError> {
    let Some(mapping) = mapping else {
        return Ok(());
    };
    let fields = mapping.undeclared_fields(source.keys());
    if fields.is_empty() {
        Ok(())
    } else {
        Err(StorageError::MappingViolation {
            collection: location.to_string(),
            fields,
        })
    }
}

#[async_trait::async_trait]
impl DocumentStore for RedisDocumentStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
        let mut connection = self.connection().await?;
        let exists: bool = connection.exists(index_key(index)).await?;
        Ok(exists)
    }

    async fn create_index(&self, index: &str) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        let created: bool = connection.set_nx(index_key(index), 1).await?;
        if !created {
            return Err(StorageError::backend(format!("index {index} exists")));
        }
        Ok(())
    }

    async fn create_collection(&self, location: &CollectionRef) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        let exists: bool = connection.exists(index_key(&location.index)).await?;
        if !exists {
            return Err(StorageError::backend(format!(
                "index {} not found",
                location.index
            )));
        }
        connection
            .sadd::<_, _, ()>(collections_key(&location.index), &location.collection)
            .await?;
        Ok(())
    }

    async fn update_mapping(
        &self,
        location: &CollectionRef,
        mapping: &MappingSchema,
    ) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        self.ensure_collection(&mut connection, location).await?;
        let data = serde_json::to_string(mapping)?;
        connection
            .set::<_, _, ()>(mapping_key(location), data)
            .await?;
        Ok(())
    }

    async fn get_document(
        &self,
        location: &CollectionRef,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let mut connection = self.connection().await?;
        self.ensure_collection(&mut connection, location).await?;
        let data: Option<String> = connection.get(document_key(location, id)).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn create_document(
        &self,
        location: &CollectionRef,
        id: &str,
        body: &Document,
    ) -> Result<CreateOutcome, StorageError> {
        let mut connection = self.connection().await?;
        self.ensure_collection(&mut connection, location).await?;
        let mapping = self.load_mapping(&mut connection, location).await?;
        check_mapping(mapping.as_ref(), location, body)?;
        let data = serde_json::to_string(body)?;
        let created: bool = connection
            .set_nx(document_key(location, id), data)
            .await?;
        if created {
            Ok(CreateOutcome::Created)
        } else {
            Ok(CreateOutcome::AlreadyExists)
        }
    }

    async fn update_document(
        &self,
        location: &CollectionRef,
        id: &str,
        patch: &Document,
        retry_on_conflict: u32,
    ) -> Result<UpdateOutcome, StorageError> {
        let mut connection = self.connection().await?;
        self.ensure_collection(&mut connection, location).await?;
        let mapping = self.load_mapping(&mut connection, location).await?;
        let key = document_key(location, id);
        let max_attempts = retry_on_conflict.saturating_add(1);

        for attempt in 1..=max_attempts {
            redis::cmd("WATCH")
                .arg(&key)
                .query_async::<_, ()>(&mut connection)
                .await?;
            let data: Option<String> = connection.get(&key).await?;
            let Some(data) = data else {
                redis::cmd("UNWATCH")
                    .query_async::<_, ()>(&mut connection)
                    .await?;
                return Ok(UpdateOutcome::NotFound);
            };

            let mut source: Document = serde_json::from_str(&data)?;
            merge_document(&mut source, patch);
            if let Err(err) = check_mapping(mapping.as_ref(), location, &source) {
                redis::cmd("UNWATCH")
                    .query_async::<_, ()>(&mut connection)
                    .await?;
                return Err(err);
            }
            let data = serde_json::to_string(&source)?;

            // EXEC 返回 nil 表示 WATCH 的键在此期间被修改
            let committed: Option<()> = redis::pipe()
                .atomic()
                .set(&key, data)
                .ignore()
                .query_async(&mut connection)
                .await?;
            if committed.is_some() {
                return Ok(UpdateOutcome::Updated { attempts: attempt });
            }
            debug!(key = %key, attempt, "document update lost a race, retrying");
        }

        Ok(UpdateOutcome::Conflict {
            attempts: max_attempts,
        })
    }
}
