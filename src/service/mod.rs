pub mod decision;
pub mod document;
pub mod export;
pub mod import;
pub mod order;

pub use decision::DecisionEngine;
pub use document::DocumentAssembler;
pub use export::summaries_to_csv;
pub use import::ImportService;
pub use order::OrderService;
