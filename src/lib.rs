pub mod categories;
pub mod column;
pub mod config;
pub mod context;
pub mod inspector;
pub mod name;
pub mod path;
pub mod providers;
pub mod registry;
pub mod scene;
pub mod signal;
pub mod tooling;

pub use categories::{classify, match_multiple, Categories, CategoryRule};
pub use column::{values_differ, CellData, DiffColumn, InspectorColumn, Side};
pub use config::InspectorConfig;
pub use context::{CancelledError, Canceller, Context, Scope};
pub use inspector::{EditTarget, Editability, Inspection, Inspector, InspectorHandle};
pub use name::{names_to_string, string_to_names, AsNames, Name, Names};
pub use path::{Contexts, InspectionPath};
pub use providers::register_builtin;
pub use registry::{CollisionPolicy, Inspections, Provider, Registry};
pub use scene::{MemoryScene, Scene, SceneHandle, SwitchScene};
pub use signal::{Connection, Signal};
