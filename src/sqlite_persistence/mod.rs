mod versioned_schema;

pub use versioned_schema::{
    add_column, create_index, read_user_version, validate_tables, write_user_version, Column,
    ColumnMatch, ForeignKey, ForeignKeyOnChange, SqlType, Table, DEFAULT_TIMESTAMP,
};
