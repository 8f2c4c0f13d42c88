//! 启动初始化：索引 / 集合 / 映射。
//!
//! 幂等：索引不存在时依次创建索引与集合；映射每次启动都重新下发。
//! 任一步骤失败即返回错误，调用方不得继续开放 Modbus 端口。

use crate::error::StorageError;
use crate::models::{CollectionRef, ProvisionOutcome};
use crate::traits::DocumentStore;
use domain::MappingSchema;
use tracing::debug;

pub async fn prepare<S>(
    store: &S,
    location: &CollectionRef,
    mapping: &MappingSchema,
) -> Result<ProvisionOutcome, StorageError>
where
    S: DocumentStore + ?Sized,
{
    debug!(index = %location.index, "checking if data index exists");
    let outcome = if store.index_exists(&location.index).await? {
        ProvisionOutcome::AlreadyPresent
    } else {
        debug!(index = %location.index, "creating new data index");
        store.create_index(&location.index).await?;
        debug!(location = %location, "creating new data collection");
        store.create_collection(location).await?;
        ProvisionOutcome::Created
    };

    debug!(location = %location, "updating data mappings");
    store.update_mapping(location, mapping).await?;
    Ok(outcome)
}
