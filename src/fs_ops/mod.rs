//! Local filesystem primitives shared by the file-backed stores.
//!
//! Everything that lands on disk goes through a temp file in the destination directory and
//! an atomic rename, so readers never observe a half-written object, journal snapshot or
//! graph file.

mod atomic;
mod copy;
mod helpers;
mod io_copy;
mod util;

pub use atomic::try_atomic_move;
pub use copy::{safe_copy_and_rename, write_atomic};
pub use helpers::io_error_with_help;
pub use io_copy::copy_streaming;
pub use util::unique_temp_path;
