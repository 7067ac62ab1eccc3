mod cli;
mod common;
mod engine;
mod persist;
