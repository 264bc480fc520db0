pub mod profile;
pub mod iso;
pub mod dc;
pub mod ebrim;
pub mod raw;
pub mod record;

pub use profile::{Declaration, SchemaProfile};
pub use record::RecordKind;
