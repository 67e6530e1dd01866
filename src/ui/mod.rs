//! Desktop front end

mod app;
pub mod history;
mod views;

pub use app::ZemaApp;
