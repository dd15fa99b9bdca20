pub mod csv_adapter;
