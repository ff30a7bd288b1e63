//! # convkit
//!
//! Command-line front end for three small demos: a unit converter, a
//! semantic-search chatbot over a fixed set of reference sentences, and a
//! BMI calculator.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌────────────────────┐   ┌──────────────────┐
//! │  CLI (clap)  │──▶│  convert / bmi     │──▶│  convkit-core    │
//! │  convkit     │   │  chat (service)    │   │  units, selector │
//! └──────────────┘   └─────────┬──────────┘   └──────────────────┘
//!                              ▼
//!                    ┌────────────────────┐
//!                    │ embedding providers│
//!                    │ fastembed / tract  │
//!                    └────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`convert`] | `convkit convert` / `convkit units` |
//! | [`chat`] | Chat service and `convkit ask` |
//! | [`embedding`] | Embedding providers and fine-tuned → pretrained fallback |
//! | [`bmi`] | `convkit bmi` |

pub mod bmi;
pub mod chat;
pub mod config;
pub mod convert;
pub mod embedding;
