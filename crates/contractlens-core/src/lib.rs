pub mod analysis;
pub mod contract;
pub mod part;
pub mod part_number;

pub use analysis::{AnalysisResult, ModelAnalysis, SECTION_KEYS};
pub use contract::{ContractDocument, ContractMetadata};
pub use part::{CurrentPricing, Month, Part, PartRecord, SupplierInfo, Trend};
pub use part_number::{PartNumber, PartNumberError, Validation};
