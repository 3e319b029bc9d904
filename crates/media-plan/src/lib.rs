//! Media planning — budget allocation across ad platforms, manual plan
//! edits, insertion orders, exports and performance forecasts.

pub mod allocator;
pub mod editor;
pub mod export;
pub mod forecast;
pub mod io;
pub mod tables;

pub use allocator::{BudgetAllocator, Flight, PlatformAllocation};
pub use export::{export_csv, io_document};
pub use forecast::{forecast, PlanForecast};
pub use io::{ensure_launchable, generate_io_number, launch, LaunchManifest};
pub use tables::{AllocationTables, WeightSource};
