pub mod schema;
pub mod sqlite;
pub mod vector;

#[allow(unused_imports)]
pub use schema::*;
pub use sqlite::*;
pub use vector::*;
