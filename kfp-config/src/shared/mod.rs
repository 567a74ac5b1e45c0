mod base;
mod document;
mod override_table;
mod plugin;
mod resources;
mod retry;
mod run;
mod toleration;
mod volume;

pub use base::*;
pub use document::FromDocument;
pub use override_table::*;
pub use plugin::*;
pub use resources::*;
pub use retry::*;
pub use run::*;
pub use toleration::*;
pub use volume::*;
