//! Cached data access for projects, tasks and notifications.

pub mod entity;
pub mod http;
pub mod mock;
pub mod query;
pub mod remote;
mod seed;
pub mod service;
pub mod types;

pub use entity::{patch_from_assignments, Entity};
pub use http::HttpRemote;
pub use mock::MockRemote;
pub use query::{ListQuery, Page, SortOrder};
pub use remote::{Remote, RemoteRequest};
pub use service::{DataService, TtlPolicy};
pub use types::{Notification, Project, SearchResults, Task};
