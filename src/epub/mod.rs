//! EPUB container reading: ZIP archive, container.xml and the OPF package.

mod parser;
mod reader;

pub(crate) use parser::{attr_value, local_name, resolve_entity};
pub use parser::{OpfData, parse_container_xml, parse_opf};
pub use reader::{read_epub, read_epub_from_reader};
