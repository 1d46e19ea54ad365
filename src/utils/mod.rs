//! Utility functions and types

pub mod data_loader;

pub use data_loader::{
    any_value_to_json, records_to_dataframe, row_values, DataFormat, DataLoader, DataSaver,
};
