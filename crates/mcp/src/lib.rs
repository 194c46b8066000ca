//! Model Context Protocol server for Tollgate.
//!
//! Exposes the discovery chain, the guarded executor, the planner tools and
//! the activity workflow as MCP tools over streamable HTTP.

pub mod server;

pub use server::{DEFAULT_BIND_ADDRESS, McpHttpLogEntry, McpHttpServer, RunningMcpHttpServer, TollgateMcpCore, resolve_bind_address};
