pub mod status;

pub use status::{StatusServer, StatusState};
