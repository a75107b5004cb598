pub use rollcall_models::teachers::*;
