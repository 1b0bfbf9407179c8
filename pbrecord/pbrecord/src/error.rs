use pbrecord_core::StoreError;
use pbrecord_protobuf::MappingError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Mapping(#[from] MappingError),
}
