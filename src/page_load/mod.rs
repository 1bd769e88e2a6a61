//! # Page-Load Estimation
//!
//! Full page-load timing for serviceable domains, obtained from an external
//! rendering collaborator.

pub mod adapter;
pub mod errors;
pub mod webdriver;

pub use adapter::PageLoadAdapter;
pub use errors::PageLoadError;
pub use webdriver::{PageLoadCollaborator, WebDriverPageLoad};
