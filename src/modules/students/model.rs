pub use rollcall_models::students::*;
