//! Static file server that answers from precompressed `.br` / `.gz`
//! siblings when they exist.
//!
//! A request for `/Build/game.wasm` is served from `game.wasm.br` with
//! `Content-Encoding: br` and `Content-Type: application/wasm` when that file
//! is present; everything else falls through to a plain file responder.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod resolver;
pub mod server;
