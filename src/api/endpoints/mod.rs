//! Function handlers. One module per function family; each handler checks
//! its collaborators, parses the body and hands off to `pipeline`.

pub mod blood_requests;
pub mod donors;
pub mod health;
pub mod reports;
pub mod triage;
