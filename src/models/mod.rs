pub mod decision;
pub mod ledger;
pub mod order;
pub mod registry;
pub mod sheet;

pub use decision::{DecisionResult, OpenItemCounts, Rationale, ReleaseStatus};
pub use ledger::{ImportReport, OpenItem};
pub use order::{
    LineItemInput, NewOrderRecord, OrderRecord, OrderRequest, OrderSummary, SubmittedOrder,
};
pub use registry::{NewRegistryEntry, RegistryEntry};
pub use sheet::SheetTable;
