pub mod leave_request;
pub mod ledger;
pub mod response;
