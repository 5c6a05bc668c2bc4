// Library root
// -----------
// diffshare uploads the working-tree diff as a public gist and prints a
// command that applies it elsewhere. The binary (`main.rs`) wires these
// modules together.
//
// Module responsibilities:
// - `api`: GitHub device authorization and gist upload clients.
// - `session`: the authorization-and-upload state machine.
// - `ui`: the foreground loop that drives a session and draws it.
// - `config`, `store`: config directory layout and the cached token.
// - `git`, `clipboard`: the local diff and the system clipboard.
pub mod api;
pub mod clipboard;
pub mod config;
pub mod error;
pub mod git;
pub mod logging;
pub mod session;
pub mod store;
pub mod ui;
