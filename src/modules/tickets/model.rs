pub use rollcall_models::tickets::*;
