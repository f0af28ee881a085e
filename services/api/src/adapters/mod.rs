pub mod db;
pub mod oplog;

pub use db::DbAdapter;
pub use oplog::LogSink;
