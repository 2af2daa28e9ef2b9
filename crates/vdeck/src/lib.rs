//! vdeck: a vertical video feed over a plain list of URLs.
//!
//! The [`feed`] module holds the slide lifecycle manager and the traits a
//! rendering host implements. [`config`] reads the user's defaults.

pub mod config;
pub mod feed;
