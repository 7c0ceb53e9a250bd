//! Request/response models

mod loan;

pub use loan::LoanRequest;
