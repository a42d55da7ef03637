mod csv_reader;
mod data_type;
mod dataset;
mod display;
mod row;
mod schema;
mod value;

pub use csv_reader::{parse_record, CsvOptions};
pub use data_type::DataType;
pub use dataset::DataSet;
pub use display::DataSetDisplay;
pub use row::Row;
pub use schema::{Field, Schema, SchemaRef};
pub use value::{OpaqueValue, Value};
