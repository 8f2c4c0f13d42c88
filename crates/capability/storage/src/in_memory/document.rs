//! 文档内存存储实现
//!
//! 仅用于本地演示和测试。
//!
//! 功能：
//! - 索引 / 集合 / 映射管理
//! - 带版本号的文档，更新走“读版本 → 锁外合并 → 比较并交换”的乐观并发
//! - strict 映射下拒绝未声明的顶层字段

use crate::error::StorageError;
use crate::models::{CollectionRef, CreateOutcome, Document, UpdateOutcome, merge_document};
use crate::traits::DocumentStore;
use domain::MappingSchema;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

#[derive(Debug, Clone)]
struct StoredDocument {
    version: u64,
    source: Document,
}

#[derive(Debug, Default)]
struct Collection {
    mapping: Option<MappingSchema>,
    documents: HashMap<String, StoredDocument>,
}

#[derive(Debug, Default)]
struct Index {
    collections: HashMap<String, Collection>,
}

/// 文档内存存储
///
/// 使用 RwLock + HashMap 提供线程安全的内存存储。
pub struct InMemoryDocumentStore {
    indexes: RwLock<HashMap<String, Index>>,
    forced_conflicts: AtomicU32,
}

impl InMemoryDocumentStore {
    /// 创建新的文档存储
    pub fn new() -> Self {
        Self {
            indexes: RwLock::new(HashMap::new()),
            forced_conflicts: AtomicU32::new(0),
        }
    }

    /// 让接下来的 `count` 次提交按版本冲突处理（用于测试）
    pub fn force_conflicts(&self, count: u32) {
        self.forced_conflicts.store(count, Ordering::SeqCst);
    }

    /// 集合内文档数量（用于测试）
    pub fn document_count(&self, location: &CollectionRef) -> usize {
        self.indexes
            .read()
            .ok()
            .and_then(|indexes| {
                indexes
                    .get(&location.index)
                    .and_then(|index| index.collections.get(&location.collection))
                    .map(|collection| collection.documents.len())
            })
            .unwrap_or(0)
    }

    /// 当前生效的映射（用于测试）
    pub fn mapping(&self, location: &CollectionRef) -> Option<MappingSchema> {
        self.indexes.read().ok().and_then(|indexes| {
            indexes
                .get(&location.index)
                .and_then(|index| index.collections.get(&location.collection))
                .and_then(|collection| collection.mapping.clone())
        })
    }

    fn take_forced_conflict(&self) -> bool {
        self.forced_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn collection_mut<'a>(
    indexes: &'a mut HashMap<String, Index>,
    location: &CollectionRef,
) -> Result<&'a mut Collection, StorageError> {
    indexes
        .get_mut(&location.index)
        .and_then(|index| index.collections.get_mut(&location.collection))
        .ok_or_else(|| StorageError::backend(format!("collection {} not found", location)))
}

fn collection<'a>(
    indexes: &'a HashMap<String, Index>,
    location: &CollectionRef,
) -> Result<&'a Collection, StorageError> {
    indexes
        .get(&location.index)
        .and_then(|index| index.collections.get(&location.collection))
        .ok_or_else(|| StorageError::backend(format!("collection {} not found", location)))
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
impl DocumentStore for InMemoryDocumentStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
        let indexes = self
            .indexes
            .read()
            .map_err(|_| StorageError::backend("lock failed"))?;
        Ok(indexes.contains_key(index))
    }

    async fn create_index(&self, index: &str) -> Result<(), StorageError> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| StorageError::backend("lock failed"))?;
        if indexes.contains_key(index) {
            return Err(StorageError::backend(format!("index {index} exists")));
        }
        indexes.insert(index.to_string(), Index::default());
        Ok(())
    }

    async fn create_collection(&self, location: &CollectionRef) -> Result<(), StorageError> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| StorageError::backend("lock failed"))?;
        let index = indexes
            .get_mut(&location.index)
            .ok_or_else(|| StorageError::backend(format!("index {} not found", location.index)))?;
        index
            .collections
            .entry(location.collection.clone())
            .or_default();
        Ok(())
    }

    async fn update_mapping(
        &self,
        location: &CollectionRef,
        mapping: &MappingSchema,
    ) -> Result<(), StorageError> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| StorageError::backend("lock failed"))?;
        collection_mut(&mut indexes, location)?.mapping = Some(mapping.clone());
        Ok(())
    }

    async fn get_document(
        &self,
        location: &CollectionRef,
        id: &str,
    ) -> Result<Option<Document>, StorageError> {
        let indexes = self
            .indexes
            .read()
            .map_err(|_| StorageError::backend("lock failed"))?;
        let item = collection(&indexes, location)?
            .documents
            .get(id)
            .map(|stored| stored.source.clone());
        Ok(item)
    }

    async fn create_document(
        &self,
        location: &CollectionRef,
        id: &str,
        body: &Document,
    ) -> Result<CreateOutcome, StorageError> {
        let mut indexes = self
            .indexes
            .write()
            .map_err(|_| StorageError::backend("lock failed"))?;
        let collection = collection_mut(&mut indexes, location)?;
        if collection.documents.contains_key(id) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        check_mapping(collection.mapping.as_ref(), location, body)?;
        collection.documents.insert(
            id.to_string(),
            StoredDocument {
                version: 1,
                source: body.clone(),
            },
        );
        Ok(CreateOutcome::Created)
    }

    async fn update_document(
        &self,
        location: &CollectionRef,
        id: &str,
        patch: &Document,
        retry_on_conflict: u32,
    ) -> Result<UpdateOutcome, StorageError> {
        let max_attempts = retry_on_conflict.saturating_add(1);

        for attempt in 1..=max_attempts {
            // 读取快照（不持锁跨越 await）
            let (version, mut source, mapping) = {
                let indexes = self
                    .indexes
                    .read()
                    .map_err(|_| StorageError::backend("lock failed"))?;
                let collection = collection(&indexes, location)?;
                match collection.documents.get(id) {
                    Some(stored) => (
                        stored.version,
                        stored.source.clone(),
                        collection.mapping.clone(),
                    ),
                    None => return Ok(UpdateOutcome::NotFound),
                }
            };

            merge_document(&mut source, patch);
            check_mapping(mapping.as_ref(), location, &source)?;

            // 让出调度，模拟存储往返期间的并发写入
            tokio::task::yield_now().await;

            let mut indexes = self
                .indexes
                .write()
                .map_err(|_| StorageError::backend("lock failed"))?;
            let collection = collection_mut(&mut indexes, location)?;
            let Some(stored) = collection.documents.get_mut(id) else {
                return Ok(UpdateOutcome::NotFound);
            };
            if stored.version != version || self.take_forced_conflict() {
                continue;
            }
            stored.version += 1;
            stored.source = source;
            return Ok(UpdateOutcome::Updated { attempts: attempt });
        }

        Ok(UpdateOutcome::Conflict {
            attempts: max_attempts,
        })
    }
}
