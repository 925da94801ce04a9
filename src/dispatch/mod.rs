mod item;
mod run;

pub use item::{BatchReport, BatchSpec, RecordStatus, RequestSpec, ResultRecord, WorkItem};
pub use run::{list_candidates, process_one, run_batch, select_range};
