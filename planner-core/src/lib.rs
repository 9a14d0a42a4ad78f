pub mod dates;
pub mod errors;
pub mod mapping;
pub mod models;
pub mod protocol;

pub use dates::*;
pub use errors::*;
pub use mapping::*;
pub use models::*;
pub use protocol::*;

pub type SyncResult<T> = Result<T, SyncError>;
