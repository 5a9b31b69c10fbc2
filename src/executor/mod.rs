//! Filesystem side effects: durable copies and move-aside deletes

pub mod copy;
pub mod relocate;

pub use copy::copy_file_atomic;
pub use relocate::{
    free_destination, move_path, relocated_path, relocation_anchor, MoveManifest, MoveRecord,
};
