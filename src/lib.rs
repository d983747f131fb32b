//! elevenlabs-mia-mcp: MCP tools for ElevenLabs speech and MIA IoT voice control.

pub mod config;
pub mod dispatcher;
pub mod elevenlabs;
pub mod error;
pub mod mia;
pub mod profiles;
pub mod server;
pub mod tools;
