// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod auth;
pub mod edit;
pub mod error;
pub mod forms;
pub mod ids;
pub mod memory;
pub mod model;
pub mod records;
pub mod state;
pub mod store;
pub mod timer;
pub mod view;

pub use auth::*;
pub use edit::*;
pub use error::*;
pub use forms::*;
pub use ids::*;
pub use memory::*;
pub use model::*;
pub use records::*;
pub use state::*;
pub use store::*;
pub use timer::*;
pub use view::*;
