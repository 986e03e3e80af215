pub mod definition;
pub mod entity;
pub mod extension;
pub mod interpreter;

pub use definition::{ColumnType, IndexColumn, IndexDefinition, SourceType};
pub use entity::{
    FieldValues, Indexable, LocalizedData, PreparedData, RelationRow, RelationalValue,
    StaticEntity,
};
pub use extension::{
    CatalogMembershipExtension, ColumnConfigExtension, ColumnsExtension, Extension,
    RelationalColumnsExtension, SystemColumns,
};
pub use interpreter::{Interpreter, InterpreterRegistry, LocalizedInterpreter, PlainInterpreter};
