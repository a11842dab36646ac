use crate::binding;
use crate::schema::Database;

pub(crate) const LIBRARY_XML: &str = include_str!("../tests/fixtures/library.xml");

pub(crate) fn library() -> Database {
    binding::parse_str(LIBRARY_XML).expect("library fixture binds")
}
