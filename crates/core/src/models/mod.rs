//! Domain models shared with the REST backend.
//!
//! These structs are both the client's in-memory shapes and the JSON wire
//! format (camelCase field names). They carry no behavior beyond pure
//! derivations such as line totals.

pub mod address;
pub mod cart;
pub mod order;

pub use address::{Address, NewAddress};
pub use cart::{CartLine, ProductSummary};
pub use order::{Order, OrderDraft, OrderLine, ReturnRequest};
