/// Integration tests running the tracker against real stores
mod support;

mod basic_integration;
mod toggle_flow;
