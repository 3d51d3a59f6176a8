// Shared stack, state and resource handling
pub mod session;

// Declarative lifecycle commands
pub mod apply;
pub mod plan;
pub mod refresh;
pub mod show;

// Tunnels
pub mod port_forward;
