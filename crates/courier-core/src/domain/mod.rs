//! Domain model (IDs, task queues, descriptors, retry policy, errors).

pub mod descriptor;
pub mod errors;
pub mod ids;
pub mod retry;
pub mod task_queue;

pub use self::descriptor::{DomainDescriptor, DomainDescriptorBuilder, HandlerKind};
pub use self::errors::{DomainResolutionError, ErrorKind, HandlerError};
pub use self::ids::{Id, IdMarker, TaskId, WorkerId};
pub use self::retry::RetryPolicy;
pub use self::task_queue::{BlankTaskQueue, TaskQueue};
