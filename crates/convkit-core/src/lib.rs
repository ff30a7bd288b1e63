//! # convkit core
//!
//! Pure logic shared by the convkit demos: unit tables and the conversion
//! engine, the BMI formula, the embedding provider trait, the reference
//! corpus and the best-match selector.
//!
//! This crate does no file or network I/O. Concrete embedding models are
//! supplied by the application crate through [`embedding::EmbeddingProvider`].

pub mod bmi;
pub mod convert;
pub mod corpus;
pub mod embedding;
pub mod selector;
pub mod units;
