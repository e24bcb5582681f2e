//! Client side of the service's REST API

mod client;
pub mod types;

pub use client::{
    ApiClient, ApiFailure, FileSubmission, FormSubmission, Timed, Upload, PASSWORD_HEADER,
    XLSX_MIME,
};
