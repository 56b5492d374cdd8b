//! Queries, one submodule per table group. Every query that touches user data
//! is scoped by the owning user's id; rows owned by someone else read as
//! not found.

mod clients;
mod invoices;
mod jobs;
mod products;
mod quotes;
mod settings;
mod users;

pub use clients::*;
pub use invoices::*;
pub use jobs::*;
pub use products::*;
pub use quotes::*;
pub use settings::*;
pub use users::*;
