// Memory and process monitoring

mod meminfo;
mod process;

pub use meminfo::MemInfo;
pub use process::ProcSource;
