//! Domain model (IDs, tools, run record, state, errors, events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod run;
pub mod state;
pub mod tool;

pub use self::errors::{ErrorKind, HandlerError, RunError, StoreError};
pub use self::events::DomainEvent;
pub use self::ids::{ParseIdError, RequestId, RunId};
pub use self::run::{DEFAULT_RUN_LIFETIME_HOURS, InputMeta, PreviewMeta, Run};
pub use self::state::{RunState, RunStatus};
pub use self::tool::{Tool, ToolInput, ToolSlug, content_type_for_ext, normalize_ext};
