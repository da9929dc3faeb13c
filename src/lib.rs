//! Cycle tracking with a device feed and model-backed advice.
//!
//! FlowFriend keeps a per-user, append-only log of daily tracking entries.
//! Entries come from manual logging or from a sensor that keeps overwriting a
//! single feed record; an ingestion listener mirrors each change into the
//! signed-in user's log. Each entry records four dimensions, every one a
//! closed enumeration with an explicit "not recorded" value:
//!
//! | Dimension | Values |
//! |-----------|--------|
//! | **Flow** | none, light spotting, moderate, heavy, extra heavy |
//! | **Mood** | super sad, only okay, comfy cozy, super duper, extra angry |
//! | **Pain** | none, back pain, cramps, pelvic pain, headaches |
//! | **Sleep** | no battery, still sleepy, decent, feeling good, fully powered |
//!
//! # Architecture
//!
//! - **Storage**: SQLite with append-only triggers on `entries`
//! - **Live views**: a background task per query re-reads on store change
//!   notifications and follows the auth state
//! - **Advice**: Gemini `generateContent` for cycle prediction, wellness
//!   insights and the health chat
//! - **Transport**: CLI screens, an HTTP device endpoint, and MCP over stdio
//!   or Streamable HTTP
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite database initialization, schema, migrations, and health checks
//! - [`tracking`] — Entry types, the entry store, anonymous identity, and live queries
//! - [`device`] — The sensor feed record and the ingestion listener
//! - [`llm`] — Generative-model client seam and the Gemini implementation
//! - [`advisory`] — Cycle arithmetic, next-cycle prediction, and wellness insights
//! - [`chat`] — The health chat session with bounded backoff

pub mod advisory;
pub mod chat;
pub mod config;
pub mod db;
pub mod device;
pub mod llm;
pub mod tracking;
