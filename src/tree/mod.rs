pub mod node;
pub mod path;
pub mod record;
pub mod navigator;
pub mod applier;
pub mod extract;

pub use applier::{PropertyUpdate, UpdateApplier};
pub use node::{Node, Slot, SlotContent, Structure, TypedValue, ValueKind};
pub use path::{PathExpression, Segment};
pub use record::RecordTree;
