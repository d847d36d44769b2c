pub mod models;
mod registry;

pub use models::FileRecord;
pub use registry::Registry;
