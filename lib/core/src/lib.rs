pub mod auth;
pub mod error;
pub mod module;
pub mod response;
pub mod types;

pub use auth::{AllowAll, Authenticator, DenyAll, Identity, UserRole};
pub use error::ServiceError;
pub use module::Module;
pub use response::{ok, ok_list, ok_message};
pub use types::{merge_patch, new_id, now_rfc3339, ListParams, ListResult};
