mod credentials;
mod records;

pub use credentials::CredentialStore;
pub use records::ERROR_COLUMN;
pub use records::RecordTable;
pub use records::cell;
