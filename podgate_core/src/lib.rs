#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_debug_implementations,
    future_incompatible,
    let_underscore,
//     missing_docs,
    rust_2021_compatibility,
    nonstandard_style
)]
#![deny(unreachable_pub)]

pub mod agent;
pub mod backend;
pub mod client;
pub mod enumerate;
pub mod error;
pub mod graph;
pub mod link;
pub mod permission;
pub mod pod_access;
pub mod resource_info;
pub mod selector;
pub mod vocab;

#[cfg(any(test, feature = "test_utils"))]
pub mod memory;
