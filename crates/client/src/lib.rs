// quillpad-client: the collaborative page-editing engine.
//
// A session's life: negotiate a descriptor (permission gate), open the
// connection (join frame), reconcile inbound frames into the editor
// surface, debounce outbound updates. The app context and REST clients
// supply the workspace state around it.

pub mod api;
pub mod config;
pub mod conn;
pub mod context;
pub mod editor;
pub mod outbound;
pub mod reconcile;
pub mod session;
