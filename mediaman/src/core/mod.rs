pub mod app;
pub mod controller;
pub mod forms;
pub mod input;
pub mod models;
pub mod service;
pub mod storage;
pub mod view;

#[cfg(test)]
pub mod testing;
