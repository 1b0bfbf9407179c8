//! Map relational records to and from protobuf messages.
//!
//! [`core`] holds the record model and store contract, [`protobuf`] the
//! schema binding and mapper. The functions here tie the two together for
//! records that live in a [`RecordStore`](pbrecord_core::RecordStore).

mod error;
mod store;

pub use error::Error;
pub use pbrecord_core as core;
pub use pbrecord_protobuf as protobuf;
pub use store::{fetch_message, store_message};
