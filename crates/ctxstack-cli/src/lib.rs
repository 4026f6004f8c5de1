// Copyright 2025 ctxstack Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # ctxstack CLI
//!
//! Command-line interface for the ctxstack context services.
//!
//! This crate provides the main entry point for running:
//!
//! - **Context server**: the in-memory context stack store over HTTP
//! - **Relay**: a forwarder in front of a context server that also serves
//!   the API documentation
//!
//! ## Architecture
//!
//! The CLI uses the `argh` crate for argument parsing and dispatches to
//! `ctxstack-server`, `ctxstack-relay` and `ctxstack-client`. Settings not
//! given as flags fall back to environment variables, resolved in [`config`].
//!
//! ## Key Commands
//!
//! - `ctxstack server`: Start the context server
//! - `ctxstack relay`: Start a relay in front of a context server
//! - `ctxstack call`: Call one context function (outputs raw JSON for scripting)

pub mod config;
